//! Operational endpoints.

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, routing::get, Router};
use serde_json::json;

use crate::app::routes::today;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/sweep", get(sweep_status).post(run_sweep))
}

/// Run a re-estimation sweep now and return its report.
///
/// Covers every owner's tracked records, like the scheduled run, and waits
/// for a scheduled sweep already in progress instead of overlapping it.
pub async fn run_sweep(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.scheduler.trigger(today()).await {
        Ok(report) => dto::ok(StatusCode::OK, report),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn sweep_status(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    dto::ok(
        StatusCode::OK,
        json!({
            "scheduler_running": services.scheduler.is_running(),
            "last_report": services.scheduler.last_report(),
        }),
    )
}
