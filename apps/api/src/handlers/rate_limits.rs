use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use fitgate_core::AppError;
use fitgate_domain::RateLimitAction;

use crate::dto::RateLimitCheckResponse;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn check_rate_limit_handler(
    State(state): State<AppState>,
    Path((action, subject_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let action = action.parse::<RateLimitAction>()?;
    let subject_id = required_segment(subject_id, "subject_id")?;

    let result = state
        .rate_limit_service
        .check_action(subject_id.as_str(), action)
        .await;

    if result.allowed {
        return Ok(Json(RateLimitCheckResponse::from(result)).into_response());
    }

    let retry_after = HeaderValue::from(result.reset_in);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitCheckResponse::from(result)),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, retry_after);
    Ok(response)
}

pub async fn reset_rate_limit_handler(
    State(state): State<AppState>,
    Path((action, subject_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let action = required_segment(action, "action")?;
    let subject_id = required_segment(subject_id, "subject_id")?;

    state
        .rate_limit_service
        .try_reset_rate_limit(subject_id.as_str(), action.as_str())
        .await
        .map_err(AppError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

fn required_segment(value: String, name: &str) -> Result<String, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }
    Ok(value)
}
