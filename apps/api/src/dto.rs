use fitgate_domain::RateLimitResult;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Health of one backing dependency.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub backend: &'static str,
    pub key_store: HealthDependencyStatus,
}

/// Outcome of one rate limit check.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/rate-limit-check-response.ts"
)]
pub struct RateLimitCheckResponse {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    /// Seconds until the current window closes.
    #[ts(type = "number")]
    pub reset_in: u64,
    pub error: Option<String>,
}

impl From<RateLimitResult> for RateLimitCheckResponse {
    fn from(value: RateLimitResult) -> Self {
        Self {
            allowed: value.allowed,
            remaining: value.remaining,
            limit: value.limit,
            reset_in: value.reset_in,
            error: value.error,
        }
    }
}

/// Incoming payload for pattern cache invalidation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/invalidate-cache-request.ts"
)]
pub struct InvalidateCacheRequest {
    /// Glob over cache keys, such as `user:profile:*`.
    pub pattern: String,
}

/// Result of a pattern cache invalidation.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/invalidate-cache-response.ts"
)]
pub struct InvalidateCacheResponse {
    #[ts(type = "number")]
    pub removed: u64,
}
