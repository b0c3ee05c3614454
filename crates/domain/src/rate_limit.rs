//! Fixed-window rate limit policies and check results.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use fitgate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Message reported on denial when the policy does not define one.
pub const DEFAULT_RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded";

const RATE_LIMIT_KEY_PREFIX: &str = "ratelimit";

/// Store key holding the window counter for one subject and action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// Derives the counter key for a subject and action.
    #[must_use]
    pub fn new(subject_id: &str, action: &str) -> Self {
        Self(format!("{RATE_LIMIT_KEY_PREFIX}:{action}:{subject_id}"))
    }

    /// Returns the key as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RateLimitKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Limit configuration for one protected action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    max_requests: u32,
    window_seconds: u64,
    error_message: Option<String>,
}

impl RateLimitConfig {
    /// Creates a validated configuration.
    pub fn new(max_requests: u32, window_seconds: u64) -> AppResult<Self> {
        if max_requests == 0 {
            return Err(AppError::Validation(
                "rate limit max_requests must be greater than zero".to_owned(),
            ));
        }

        if window_seconds == 0 {
            return Err(AppError::Validation(
                "rate limit window_seconds must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            max_requests,
            window_seconds,
            error_message: None,
        })
    }

    /// Sets the message reported to the caller on denial.
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Maximum admissions per window.
    #[must_use]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Window length in seconds.
    #[must_use]
    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    /// Custom denial message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Message surfaced on denial, falling back to the default text.
    #[must_use]
    pub fn denial_message(&self) -> &str {
        self.error_message
            .as_deref()
            .unwrap_or(DEFAULT_RATE_LIMIT_MESSAGE)
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitResult {
    /// Whether the attempt is admitted.
    pub allowed: bool,
    /// Admissions left in the current window.
    pub remaining: u32,
    /// Configured maximum for the window.
    pub limit: u32,
    /// Seconds until the window resets.
    pub reset_in: u64,
    /// Human-readable denial message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RateLimitResult {
    /// Full-budget admission used when the store is absent or unhealthy.
    #[must_use]
    pub fn permissive(config: &RateLimitConfig) -> Self {
        Self {
            allowed: true,
            remaining: config.max_requests,
            limit: config.max_requests,
            reset_in: config.window_seconds,
            error: None,
        }
    }

    /// Admission after the counter reached `count` within the window.
    #[must_use]
    pub fn admitted(config: &RateLimitConfig, count: u64, reset_in: u64) -> Self {
        let remaining = u64::from(config.max_requests).saturating_sub(count);

        Self {
            allowed: true,
            remaining: u32::try_from(remaining).unwrap_or(0),
            limit: config.max_requests,
            reset_in,
            error: None,
        }
    }

    /// Denial carrying the policy message.
    #[must_use]
    pub fn denied(config: &RateLimitConfig, reset_in: u64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            limit: config.max_requests,
            reset_in,
            error: Some(config.denial_message().to_owned()),
        }
    }
}

/// Named actions with a predefined rate limit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAction {
    /// AI meal-plan generation.
    AiMealPlan,
    /// AI workout-plan generation.
    AiWorkoutPlan,
    /// Log-creation mutations.
    CreateLog,
    /// Profile updates.
    UpdateProfile,
    /// Image uploads.
    UploadImage,
    /// Calls to external APIs.
    ExternalApi,
}

impl RateLimitAction {
    /// Every named action.
    pub const ALL: [Self; 6] = [
        Self::AiMealPlan,
        Self::AiWorkoutPlan,
        Self::CreateLog,
        Self::UpdateProfile,
        Self::UploadImage,
        Self::ExternalApi,
    ];

    /// Returns the stable action name used in counter keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AiMealPlan => "ai_meal_plan",
            Self::AiWorkoutPlan => "ai_workout_plan",
            Self::CreateLog => "create_log",
            Self::UpdateProfile => "update_profile",
            Self::UploadImage => "upload_image",
            Self::ExternalApi => "external_api",
        }
    }

    /// Returns the policy for this action.
    #[must_use]
    pub fn config(self) -> RateLimitConfig {
        match self {
            Self::AiMealPlan => policy(
                3,
                60 * 60,
                "You can only generate 3 meal plans per hour. Please try again later.",
            ),
            Self::AiWorkoutPlan => policy(
                3,
                60 * 60,
                "You can only generate 3 workout plans per hour. Please try again later.",
            ),
            Self::CreateLog => policy(100, 60, "Too many requests. Please slow down."),
            Self::UpdateProfile => {
                policy(10, 60, "Too many profile updates. Please wait a moment.")
            }
            Self::UploadImage => policy(10, 60 * 60, "You can upload up to 10 images per hour."),
            Self::ExternalApi => policy(
                60,
                60,
                "API rate limit exceeded. Please try again in a moment.",
            ),
        }
    }
}

impl Display for RateLimitAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for RateLimitAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown rate limit action '{value}'")))
    }
}

fn policy(max_requests: u32, window_seconds: u64, message: &str) -> RateLimitConfig {
    RateLimitConfig {
        max_requests,
        window_seconds,
        error_message: Some(message.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn key_is_namespaced_by_action_then_subject() {
        let key = RateLimitKey::new("u1", "ai_meal_plan");
        assert_eq!(key.as_str(), "ratelimit:ai_meal_plan:u1");
    }

    #[test]
    fn zero_max_requests_is_rejected() {
        assert!(RateLimitConfig::new(0, 60).is_err());
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(RateLimitConfig::new(5, 0).is_err());
    }

    #[test]
    fn denial_uses_default_message_without_custom_one() {
        let Ok(config) = RateLimitConfig::new(1, 60) else {
            panic!("valid config rejected");
        };

        let result = RateLimitResult::denied(&config, 12);
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.reset_in, 12);
        assert_eq!(result.error.as_deref(), Some(DEFAULT_RATE_LIMIT_MESSAGE));
    }

    #[test]
    fn admitted_never_reports_negative_remaining() {
        let Ok(config) = RateLimitConfig::new(2, 60) else {
            panic!("valid config rejected");
        };

        assert_eq!(RateLimitResult::admitted(&config, 1, 60).remaining, 1);
        assert_eq!(RateLimitResult::admitted(&config, 5, 60).remaining, 0);
    }

    #[test]
    fn permissive_result_reports_full_budget() {
        let config = RateLimitAction::AiMealPlan.config();
        let result = RateLimitResult::permissive(&config);

        assert!(result.allowed);
        assert_eq!(result.remaining, 3);
        assert_eq!(result.limit, 3);
        assert_eq!(result.reset_in, 3600);
        assert!(result.error.is_none());
    }

    #[test]
    fn named_policies_match_published_limits() {
        let expected = [
            (RateLimitAction::AiMealPlan, 3, 3600),
            (RateLimitAction::AiWorkoutPlan, 3, 3600),
            (RateLimitAction::CreateLog, 100, 60),
            (RateLimitAction::UpdateProfile, 10, 60),
            (RateLimitAction::UploadImage, 10, 3600),
            (RateLimitAction::ExternalApi, 60, 60),
        ];

        for (action, max_requests, window_seconds) in expected {
            let config = action.config();
            assert_eq!(config.max_requests(), max_requests, "{action}");
            assert_eq!(config.window_seconds(), window_seconds, "{action}");
            assert!(config.error_message().is_some(), "{action}");
        }
    }

    #[test]
    fn action_names_round_trip_through_from_str() {
        for action in RateLimitAction::ALL {
            assert_eq!(action.as_str().parse::<RateLimitAction>().ok(), Some(action));
        }
        assert!("ai_anything".parse::<RateLimitAction>().is_err());
    }

    #[test]
    fn denied_result_serializes_error_and_permissive_omits_it() {
        let config = RateLimitAction::UploadImage.config();
        let denied = serde_json::to_value(RateLimitResult::denied(&config, 30));
        let permissive = serde_json::to_value(RateLimitResult::permissive(&config));

        let (Ok(denied), Ok(permissive)) = (denied, permissive) else {
            panic!("result serialization failed");
        };
        assert_eq!(
            denied["error"],
            "You can upload up to 10 images per hour."
        );
        assert!(permissive.get("error").is_none());
    }

    proptest! {
        #[test]
        fn distinct_subjects_never_share_a_counter(
            first in "[a-z0-9-]{1,24}",
            second in "[a-z0-9-]{1,24}",
        ) {
            prop_assume!(first != second);
            let action = RateLimitAction::CreateLog.as_str();
            prop_assert_ne!(
                RateLimitKey::new(&first, action),
                RateLimitKey::new(&second, action)
            );
        }

        #[test]
        fn key_derivation_is_deterministic(subject in "[a-zA-Z0-9_-]{1,32}") {
            let action = RateLimitAction::UpdateProfile.as_str();
            let key = RateLimitKey::new(&subject, action);
            prop_assert_eq!(&key, &RateLimitKey::new(&subject, action));
            prop_assert!(key.as_str().ends_with(subject.as_str()));
        }
    }
}
