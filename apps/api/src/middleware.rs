use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use fitgate_core::AppError;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    authorize_admin(request.headers(), state.admin_token.as_deref())?;
    Ok(next.run(request).await)
}

/// Admin routes stay closed when no token is configured.
pub fn authorize_admin(headers: &HeaderMap, admin_token: Option<&str>) -> ApiResult<()> {
    let Some(expected) = admin_token else {
        return Err(AppError::Unauthorized("admin access is not configured".to_owned()).into());
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_default();

    if presented.is_empty() || !tokens_match(presented.as_bytes(), expected.as_bytes()) {
        return Err(AppError::Unauthorized("admin token required".to_owned()).into());
    }

    Ok(())
}

// Length leaks, contents do not.
fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.len() == expected.len()
        && presented
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (left, right)| acc | (left ^ right))
            == 0
}
