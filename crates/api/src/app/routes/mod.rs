use std::sync::Arc;

use axum::Router;
use chrono::{Local, NaiveDate};

use scentrack_core::{FragranceId, UserId};

use crate::app::{dto, errors, services::AppServices};

pub mod admin;
pub mod fragrances;
pub mod inventory;
pub mod stats;
pub mod system;
pub mod wear;

/// Router for all user-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/fragrances", fragrances::router())
        .nest("/inventory", inventory::router())
        .nest("/wear", wear::router())
        .nest("/stats", stats::router())
        .nest("/admin", admin::router())
}

/// Calendar day used for usage dates and estimates.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a fragrance id from the path and check it belongs to `owner`.
///
/// Someone else's fragrance is reported as not found.
pub(crate) async fn owned_fragrance(
    services: &Arc<AppServices>,
    owner: UserId,
    raw_id: &str,
) -> Result<FragranceId, axum::response::Response> {
    let id: FragranceId = dto::parse_id(raw_id, "fragrance")?;
    services
        .catalog
        .get_owned_by(owner, id)
        .await
        .map(|f| f.id)
        .map_err(errors::service_error_to_response)
}
