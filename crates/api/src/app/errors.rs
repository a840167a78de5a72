use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use scentrack_core::DomainError;
use scentrack_infra::ServiceError;

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const CONFLICT: &str = "CONFLICT";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Persistence(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR, "internal error")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let (status, code) = match &err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, VALIDATION_ERROR),
        DomainError::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND),
        DomainError::AlreadyExists(_) => (StatusCode::CONFLICT, CONFLICT),
    };
    json_error(status, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message.into(),
            },
        })),
    )
        .into_response()
}

pub fn validation_error(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, VALIDATION_ERROR, message)
}
