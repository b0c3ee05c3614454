//! Fixed-window rate limiting over the key store.
//!
//! Every `(subject, action)` pair owns one counter key. The first admission in
//! a window creates the counter and starts its expiry; denials never touch the
//! counter. Transport failures admit the request.

use std::sync::Arc;

use fitgate_core::{StoreResult, TransportError};
use fitgate_domain::{RateLimitAction, RateLimitConfig, RateLimitKey, RateLimitResult};
use tracing::{debug, warn};

use crate::{KeyStore, KeyTtl};

/// Application service for admission control.
#[derive(Clone)]
pub struct RateLimitService {
    store: Arc<dyn KeyStore>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    /// Whether checks are backed by a store. When `false` every check admits.
    #[must_use]
    pub fn is_enforcing(&self) -> bool {
        self.store.is_configured()
    }

    /// Checks and records one attempt, admitting it when the store fails.
    pub async fn check_rate_limit(
        &self,
        subject_id: &str,
        action: &str,
        config: &RateLimitConfig,
    ) -> RateLimitResult {
        match self.try_check_rate_limit(subject_id, action, config).await {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    subject_id,
                    action,
                    error = %error,
                    "rate limit check failed, admitting request"
                );
                RateLimitResult::permissive(config)
            }
        }
    }

    /// Checks and records one attempt, surfacing transport failures.
    ///
    /// An unconfigured store is not a failure and yields a permissive result.
    pub async fn try_check_rate_limit(
        &self,
        subject_id: &str,
        action: &str,
        config: &RateLimitConfig,
    ) -> StoreResult<RateLimitResult> {
        if !self.store.is_configured() {
            return Ok(RateLimitResult::permissive(config));
        }

        let key = RateLimitKey::new(subject_id, action);
        let max_requests = u64::from(config.max_requests());

        let count = self.current_count(&key).await?;
        if count >= max_requests {
            let reset_in = self.reset_in(&key, config).await?;
            debug!(key = %key, count, reset_in, "rate limit exceeded");
            return Ok(RateLimitResult::denied(config, reset_in));
        }

        let new_count = self.store.increment(key.as_str()).await?;
        if new_count == 1 {
            self.store
                .expire(key.as_str(), config.window_seconds())
                .await?;
        }
        let reset_in = self.reset_in(&key, config).await?;

        let new_count = u64::try_from(new_count).map_err(|_| {
            TransportError::MalformedResponse(format!(
                "counter '{key}' went negative: {new_count}"
            ))
        })?;

        // Another caller claimed the last slot between our read and increment.
        if new_count > max_requests {
            debug!(key = %key, new_count, "rate limit lost admission race");
            return Ok(RateLimitResult::denied(config, reset_in));
        }

        Ok(RateLimitResult::admitted(config, new_count, reset_in))
    }

    /// Checks one of the named policies.
    pub async fn check_action(&self, subject_id: &str, action: RateLimitAction) -> RateLimitResult {
        self.check_rate_limit(subject_id, action.as_str(), &action.config())
            .await
    }

    /// Whether the subject may generate an AI meal plan now.
    pub async fn can_generate_meal_plan(&self, subject_id: &str) -> RateLimitResult {
        self.check_action(subject_id, RateLimitAction::AiMealPlan)
            .await
    }

    /// Whether the subject may generate an AI workout plan now.
    pub async fn can_generate_workout_plan(&self, subject_id: &str) -> RateLimitResult {
        self.check_action(subject_id, RateLimitAction::AiWorkoutPlan)
            .await
    }

    /// Whether the subject may upload an image now.
    pub async fn can_upload_image(&self, subject_id: &str) -> RateLimitResult {
        self.check_action(subject_id, RateLimitAction::UploadImage)
            .await
    }

    /// Whether the subject may update their profile now.
    pub async fn can_update_profile(&self, subject_id: &str) -> RateLimitResult {
        self.check_action(subject_id, RateLimitAction::UpdateProfile)
            .await
    }

    /// Whether the subject may create another log entry now.
    pub async fn can_create_log(&self, subject_id: &str) -> RateLimitResult {
        self.check_action(subject_id, RateLimitAction::CreateLog)
            .await
    }

    /// Whether the subject may call an external API now.
    pub async fn can_call_external_api(&self, subject_id: &str) -> RateLimitResult {
        self.check_action(subject_id, RateLimitAction::ExternalApi)
            .await
    }

    /// Clears the subject's window for an action. Failures are logged only.
    pub async fn reset_rate_limit(&self, subject_id: &str, action: &str) {
        if let Err(error) = self.try_reset_rate_limit(subject_id, action).await {
            warn!(
                subject_id,
                action,
                error = %error,
                "failed to reset rate limit"
            );
        }
    }

    /// Clears the subject's window for an action, surfacing transport failures.
    pub async fn try_reset_rate_limit(&self, subject_id: &str, action: &str) -> StoreResult<()> {
        if !self.store.is_configured() {
            return Ok(());
        }

        let key = RateLimitKey::new(subject_id, action);
        self.store.delete(key.as_str()).await?;
        debug!(key = %key, "rate limit reset");
        Ok(())
    }

    async fn current_count(&self, key: &RateLimitKey) -> StoreResult<u64> {
        let Some(raw) = self.store.get(key.as_str()).await? else {
            return Ok(0);
        };

        raw.trim().parse::<u64>().map_err(|error| {
            TransportError::MalformedResponse(format!(
                "counter '{key}' holds non-numeric value '{raw}': {error}"
            ))
        })
    }

    async fn reset_in(&self, key: &RateLimitKey, config: &RateLimitConfig) -> StoreResult<u64> {
        let window_seconds = config.window_seconds();

        match self.store.ttl(key.as_str()).await? {
            KeyTtl::Persistent => {
                // A crash between increment and expire leaves a counter that
                // would never reset.
                warn!(
                    key = %key,
                    window_seconds,
                    "rate limit counter had no expiry, restoring window"
                );
                self.store.expire(key.as_str(), window_seconds).await?;
                Ok(window_seconds)
            }
            ttl => Ok(ttl.remaining_seconds().unwrap_or(window_seconds)),
        }
    }
}
