use std::sync::Arc;

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Extension, Json, Path, Query},
    http::StatusCode,
    routing::get,
    Router,
};
use chrono::{Days, NaiveDate};

use crate::app::routes::today;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

/// Default span of `GET /wear` when no range is given.
const DEFAULT_RANGE_DAYS: u64 = 30;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_wear).post(record_wear))
        .route("/:date", get(get_wear))
}

/// Inventory problems for individual entries come back as `warnings`; the
/// wear itself is still recorded.
pub async fn record_wear(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    payload: Result<Json<dto::RecordWearRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let today = today();
    match services
        .wear
        .record(body.into_new(user.user_id(), today), today)
        .await
    {
        Ok(outcome) => dto::ok(StatusCode::CREATED, outcome),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_wear(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    params: Result<Query<dto::DateRangeQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match dto::query(params) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let to = params.to.unwrap_or_else(today);
    let from = params.from.unwrap_or_else(|| {
        to.checked_sub_days(Days::new(DEFAULT_RANGE_DAYS - 1))
            .unwrap_or(NaiveDate::MIN)
    });

    match services.wear.list(user.user_id(), from, to).await {
        Ok(records) => dto::ok(StatusCode::OK, records),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_wear(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(date): Path<String>,
) -> axum::response::Response {
    let date = match dto::parse_date(&date) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.wear.get(user.user_id(), date).await {
        Ok(Some(record)) => dto::ok(StatusCode::OK, record),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            errors::NOT_FOUND,
            format!("no wear recorded on {date}"),
        ),
        Err(e) => errors::service_error_to_response(e),
    }
}
