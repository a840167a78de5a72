//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and the success envelope
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `server.rs` and tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let user_state = middleware::UserState {
        default_user_id: services.config.default_user_id,
    };

    // Every domain route runs with a resolved user context.
    let api = routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(services))
            .layer(axum::middleware::from_fn_with_state(
                user_state,
                middleware::user_context_middleware,
            )),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(api)
}
