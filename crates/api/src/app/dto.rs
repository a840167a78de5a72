use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use scentrack_core::{FragranceId, UserId};
use scentrack_inventory::{
    InventoryPatch, InventoryRecord, ListType, NewFragrance, NewInventory, NewUsage, NewWear,
    UsageEvent, WearEntry,
};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateFragranceRequest {
    pub name: String,
    pub brand: Option<String>,
    pub list_type: Option<ListType>,
}

impl CreateFragranceRequest {
    pub fn into_new(self, owner: UserId) -> NewFragrance {
        NewFragrance {
            owner_user_id: owner,
            name: self.name,
            brand: self.brand,
            list_type: self.list_type.unwrap_or(ListType::Owned),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListFragrancesQuery {
    pub list_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInventoryRequest {
    pub bottle_size_ml: f64,
    pub purchase_date: Option<NaiveDate>,
    pub current_level_percent: Option<f64>,
    pub usage_tracking_enabled: Option<bool>,
    pub low_threshold_percent: Option<f64>,
}

impl CreateInventoryRequest {
    pub fn into_new(self, fragrance_id: FragranceId) -> NewInventory {
        NewInventory {
            fragrance_id,
            bottle_size_ml: self.bottle_size_ml,
            purchase_date: self.purchase_date,
            current_level_percent: self.current_level_percent,
            usage_tracking_enabled: self.usage_tracking_enabled,
            low_threshold_percent: self.low_threshold_percent,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GetInventoryQuery {
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditInventoryRequest {
    pub bottle_size_ml: Option<f64>,
    pub current_level_percent: Option<f64>,
    pub low_threshold_percent: Option<f64>,
    pub usage_tracking_enabled: Option<bool>,
    pub purchase_date: Option<NaiveDate>,
}

impl From<EditInventoryRequest> for InventoryPatch {
    fn from(req: EditInventoryRequest) -> Self {
        InventoryPatch {
            bottle_size_ml: req.bottle_size_ml,
            current_level_percent: req.current_level_percent,
            low_threshold_percent: req.low_threshold_percent,
            usage_tracking_enabled: req.usage_tracking_enabled,
            purchase_date: req.purchase_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordUsageRequest {
    /// Defaults to today.
    pub date: Option<NaiveDate>,
    pub spray_count: u32,
    pub estimated_usage_ml: Option<f64>,
    pub note: Option<String>,
}

impl RecordUsageRequest {
    pub fn into_new(self, fragrance_id: FragranceId, today: NaiveDate) -> NewUsage {
        NewUsage {
            fragrance_id,
            date: self.date.unwrap_or(today),
            spray_count: self.spray_count,
            estimated_usage_ml: self.estimated_usage_ml,
            note: self.note,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct WearEntryRequest {
    pub fragrance_id: FragranceId,
    #[serde(default)]
    pub spray_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct RecordWearRequest {
    pub date: Option<NaiveDate>,
    pub note: Option<String>,
    pub entries: Vec<WearEntryRequest>,
}

impl RecordWearRequest {
    pub fn into_new(self, owner: UserId, today: NaiveDate) -> NewWear {
        NewWear {
            owner_user_id: owner,
            date: self.date.unwrap_or(today),
            note: self.note.filter(|n| !n.trim().is_empty()),
            entries: self
                .entries
                .into_iter()
                .map(|e| WearEntry {
                    fragrance_id: e.fragrance_id,
                    spray_count: e.spray_count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub window_days: Option<u32>,
}

// -------------------------
// Response helpers
// -------------------------

#[derive(Debug, Serialize)]
pub struct RecordedUsage {
    pub usage_event: UsageEvent,
    pub inventory: InventoryRecord,
}

#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

/// Wrap `data` in the success envelope.
pub fn ok<T: Serialize>(status: StatusCode, data: T) -> axum::response::Response {
    (status, Json(Envelope { success: true, data })).into_response()
}

/// Unwrap a JSON body, answering malformed input with a validation error.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| errors::validation_error(e.body_text()))
}

pub fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, axum::response::Response> {
    params
        .map(|Query(v)| v)
        .map_err(|e| errors::validation_error(e.body_text()))
}

pub fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::validation_error(format!("invalid {what} id")))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, axum::response::Response> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| errors::validation_error("date must be YYYY-MM-DD"))
}
