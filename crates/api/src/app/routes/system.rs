use axum::http::StatusCode;
use serde_json::json;

use crate::app::dto;

pub async fn health() -> axum::response::Response {
    dto::ok(StatusCode::OK, json!({ "status": "ok" }))
}
