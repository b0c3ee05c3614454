use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use fitgate_core::AppError;
use fitgate_domain::KeyPattern;

use crate::dto::{InvalidateCacheRequest, InvalidateCacheResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn delete_cache_key_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    if key.trim().is_empty() {
        return Err(AppError::Validation("cache key must not be empty".to_owned()).into());
    }

    state
        .cache_service
        .try_delete(key.as_str())
        .await
        .map_err(AppError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn invalidate_cache_handler(
    State(state): State<AppState>,
    Json(payload): Json<InvalidateCacheRequest>,
) -> ApiResult<Json<InvalidateCacheResponse>> {
    let pattern = KeyPattern::parse(payload.pattern.trim())?;

    let removed = state
        .cache_service
        .try_delete_pattern(&pattern)
        .await
        .map_err(AppError::from)?;

    Ok(Json(InvalidateCacheResponse {
        removed: u64::try_from(removed).unwrap_or(u64::MAX),
    }))
}
