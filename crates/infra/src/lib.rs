//! Infrastructure layer: SQLite persistence, configuration and the services
//! that combine storage with the inventory domain rules.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod stats;
pub mod store;
pub mod sweep;
pub mod wear;

#[cfg(test)]
mod integration_tests;

pub use catalog::FragranceCatalog;
pub use config::{AppConfig, ConfigError};
pub use error::{ServiceError, ServiceResult};
pub use ledger::InventoryLedger;
pub use stats::UsageStats;
pub use sweep::{FirstRun, SweepConfig, SweepJob, SweepReport, SweepScheduler};
pub use wear::{InventoryWarning, WearOutcome, WearRecorder};
