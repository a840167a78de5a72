//! Configuration loading and representation.
//!
//! Everything comes from environment variables with development defaults.

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

use scentrack_core::UserId;
use scentrack_inventory::estimate::DEFAULT_WINDOW_DAYS;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://scentrack.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
/// Account used when a request carries no `x-user-id` header.
pub const DEFAULT_USER_ID: &str = "00000000-0000-7000-8000-000000000001";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub default_user_id: UserId,
    pub sweep_enabled: bool,
    pub usage_window_days: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = parse(
            "BIND_ADDR",
            lookup("BIND_ADDR").as_deref().unwrap_or(DEFAULT_BIND_ADDR),
        )?;
        let default_user_id = parse(
            "DEFAULT_USER_ID",
            lookup("DEFAULT_USER_ID").as_deref().unwrap_or(DEFAULT_USER_ID),
        )?;
        let sweep_enabled = match lookup("SWEEP_ENABLED") {
            Some(raw) => parse_bool("SWEEP_ENABLED", &raw)?,
            None => true,
        };
        let usage_window_days: u32 = match lookup("USAGE_WINDOW_DAYS") {
            Some(raw) => parse("USAGE_WINDOW_DAYS", &raw)?,
            None => DEFAULT_WINDOW_DAYS,
        };
        if usage_window_days == 0 {
            return Err(ConfigError::Invalid {
                key: "USAGE_WINDOW_DAYS",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            database_url,
            bind_addr,
            default_user_id,
            sweep_enabled,
            usage_window_days,
        })
    }

    /// Private in-memory database, scheduler off. Used by tests and demos.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            default_user_id: DEFAULT_USER_ID.parse().unwrap_or_default(),
            sweep_enabled: false,
            usage_window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: e.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}
