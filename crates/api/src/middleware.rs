use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use scentrack_core::UserId;

use crate::app::errors;
use crate::context::UserContext;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct UserState {
    pub default_user_id: UserId,
}

/// Derive the acting user from `x-user-id`, falling back to the default user.
pub async fn user_context_middleware(
    State(state): State<UserState>,
    mut req: Request,
    next: Next,
) -> Response {
    let user_id = match extract_user_id(req.headers()) {
        Ok(Some(id)) => id,
        Ok(None) => state.default_user_id,
        Err(message) => {
            return errors::json_error(StatusCode::BAD_REQUEST, errors::VALIDATION_ERROR, message);
        }
    };

    req.extensions_mut().insert(UserContext::new(user_id));
    next.run(req).await
}

fn extract_user_id(headers: &HeaderMap) -> Result<Option<UserId>, &'static str> {
    let Some(header) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let raw = header.to_str().map_err(|_| "x-user-id must be a UUID")?.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    raw.parse().map(Some).map_err(|_| "x-user-id must be a UUID")
}
