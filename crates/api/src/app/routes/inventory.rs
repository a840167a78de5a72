use std::sync::Arc;

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Extension, Json, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Router,
};

use crate::app::routes::{owned_fragrance, today};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/low-stock", get(list_low_stock))
        .route(
            "/:fragrance_id",
            get(get_inventory).post(create_inventory).patch(edit_inventory),
        )
        .route("/:fragrance_id/usage", get(list_usage).post(record_usage))
        .route("/:fragrance_id/estimate", post(estimate))
}

pub async fn create_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(fragrance_id): Path<String>,
    payload: Result<Json<dto::CreateInventoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let fragrance_id = match owned_fragrance(&services, user.user_id(), &fragrance_id).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger.create(body.into_new(fragrance_id), today()).await {
        Ok(record) => dto::ok(StatusCode::CREATED, record),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// 404 for an untracked fragrance unless `?default=true` asks for the
/// implicit full-bottle view.
pub async fn get_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(fragrance_id): Path<String>,
    params: Result<Query<dto::GetInventoryQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match dto::query(params) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let fragrance_id = match owned_fragrance(&services, user.user_id(), &fragrance_id).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    if params.default {
        return match services.ledger.get_or_default(fragrance_id).await {
            Ok(record) => dto::ok(StatusCode::OK, record),
            Err(e) => errors::service_error_to_response(e),
        };
    }

    match services.ledger.get(fragrance_id).await {
        Ok(Some(record)) => dto::ok(StatusCode::OK, record),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            errors::NOT_FOUND,
            "fragrance is not tracked",
        ),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn edit_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(fragrance_id): Path<String>,
    payload: Result<Json<dto::EditInventoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let fragrance_id = match owned_fragrance(&services, user.user_id(), &fragrance_id).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger.edit(fragrance_id, body.into(), today()).await {
        Ok(record) => dto::ok(StatusCode::OK, record),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn record_usage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(fragrance_id): Path<String>,
    payload: Result<Json<dto::RecordUsageRequest>, JsonRejection>,
) -> axum::response::Response {
    let fragrance_id = match owned_fragrance(&services, user.user_id(), &fragrance_id).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let today = today();
    match services
        .ledger
        .record_usage(body.into_new(fragrance_id, today), today)
        .await
    {
        Ok((usage_event, inventory)) => dto::ok(
            StatusCode::CREATED,
            dto::RecordedUsage {
                usage_event,
                inventory,
            },
        ),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_usage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(fragrance_id): Path<String>,
    params: Result<Query<dto::DateRangeQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match dto::query(params) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let fragrance_id = match owned_fragrance(&services, user.user_id(), &fragrance_id).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.stats.list_usage(fragrance_id, params.from, params.to).await {
        Ok(events) => dto::ok(StatusCode::OK, events),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn estimate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(fragrance_id): Path<String>,
) -> axum::response::Response {
    let fragrance_id = match owned_fragrance(&services, user.user_id(), &fragrance_id).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger.estimate(fragrance_id, today()).await {
        Ok(record) => dto::ok(StatusCode::OK, record),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    match services.ledger.list_low_stock(user.user_id()).await {
        Ok(alerts) => dto::ok(StatusCode::OK, alerts),
        Err(e) => errors::service_error_to_response(e),
    }
}
