use std::sync::Arc;

use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Extension, Json, Path, Query},
    http::StatusCode,
    routing::get,
    Router,
};
use serde_json::json;

use scentrack_inventory::ListType;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_fragrances).post(create_fragrance))
        .route("/:id", get(get_fragrance).delete(delete_fragrance))
}

pub async fn create_fragrance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    payload: Result<Json<dto::CreateFragranceRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.create(body.into_new(user.user_id())).await {
        Ok(fragrance) => dto::ok(StatusCode::CREATED, fragrance),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_fragrances(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    params: Result<Query<dto::ListFragrancesQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match dto::query(params) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let list_type = match params.list_type.as_deref().map(str::parse::<ListType>).transpose() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog.list(user.user_id(), list_type).await {
        Ok(fragrances) => dto::ok(StatusCode::OK, fragrances),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_fragrance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_id(&id, "fragrance") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.get_owned_by(user.user_id(), id).await {
        Ok(fragrance) => dto::ok(StatusCode::OK, fragrance),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Deletes the fragrance with its inventory record, usage log and wear entries.
pub async fn delete_fragrance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match dto::parse_id(&id, "fragrance") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog.delete(user.user_id(), id).await {
        Ok(()) => dto::ok(StatusCode::OK, json!({ "id": id, "deleted": true })),
        Err(e) => errors::service_error_to_response(e),
    }
}
