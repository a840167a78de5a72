use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Router,
};

use crate::app::routes::{owned_fragrance, today};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/usage", get(collection_usage))
        .route("/usage/:fragrance_id", get(fragrance_usage))
}

pub async fn collection_usage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    params: Result<Query<dto::StatsQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match dto::query(params) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .stats
        .collection(user.user_id(), today(), params.window_days)
        .await
    {
        Ok(stats) => dto::ok(StatusCode::OK, stats),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn fragrance_usage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(fragrance_id): Path<String>,
    params: Result<Query<dto::StatsQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match dto::query(params) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let fragrance_id = match owned_fragrance(&services, user.user_id(), &fragrance_id).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .stats
        .summary(fragrance_id, today(), params.window_days)
        .await
    {
        Ok(summary) => dto::ok(StatusCode::OK, summary),
        Err(e) => errors::service_error_to_response(e),
    }
}
