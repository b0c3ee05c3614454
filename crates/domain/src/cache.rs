//! Cache tiers and key namespacing.

use std::fmt::{Display, Formatter};

use chrono::NaiveDate;

/// Registry set listing every namespace that has an index.
pub const CACHE_INDEX_REGISTRY_KEY: &str = "cache:index";

/// Named TTL durations used by cache writers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// One minute.
    Short,
    /// Five minutes.
    #[default]
    Medium,
    /// One hour.
    Long,
    /// One day.
    Day,
}

impl CacheTier {
    /// Returns the tier duration in seconds.
    #[must_use]
    pub fn ttl_seconds(self) -> u64 {
        match self {
            Self::Short => 60,
            Self::Medium => 5 * 60,
            Self::Long => 60 * 60,
            Self::Day => 24 * 60 * 60,
        }
    }
}

/// Kinds of cached data, each with its own key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// `user:profile:{subject}`
    UserProfile,
    /// `meal:plan:{subject}`
    MealPlan,
    /// `workout:plan:{subject}`
    WorkoutPlan,
    /// `nutrition:logs:{subject}:{date}`
    NutritionLogs,
    /// `workout:logs:{subject}:{date}`
    WorkoutLogs,
    /// `ai:status:{generation_type}:{subject}`
    AiGenerationStatus,
    /// `session:{session_id}`
    Session,
}

impl CacheNamespace {
    /// Returns the key prefix shared by every key of this kind.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::UserProfile => "user:profile",
            Self::MealPlan => "meal:plan",
            Self::WorkoutPlan => "workout:plan",
            Self::NutritionLogs => "nutrition:logs",
            Self::WorkoutLogs => "workout:logs",
            Self::AiGenerationStatus => "ai:status",
            Self::Session => "session",
        }
    }

    /// Returns the tier writers use unless they pick another.
    #[must_use]
    pub fn default_tier(self) -> CacheTier {
        match self {
            Self::UserProfile => CacheTier::Long,
            Self::MealPlan | Self::WorkoutPlan => CacheTier::Medium,
            Self::NutritionLogs | Self::WorkoutLogs | Self::AiGenerationStatus => {
                CacheTier::Short
            }
            Self::Session => CacheTier::Day,
        }
    }
}

/// Fully namespaced cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for data owned by one subject.
    #[must_use]
    pub fn for_subject(namespace: CacheNamespace, subject_id: &str) -> Self {
        Self(format!("{}:{subject_id}", namespace.prefix()))
    }

    /// Key for one subject's data on one calendar day.
    #[must_use]
    pub fn for_subject_on(namespace: CacheNamespace, subject_id: &str, date: NaiveDate) -> Self {
        Self(format!(
            "{}:{subject_id}:{}",
            namespace.prefix(),
            date.format("%Y-%m-%d")
        ))
    }

    /// `user:profile:{subject}`
    #[must_use]
    pub fn user_profile(subject_id: &str) -> Self {
        Self::for_subject(CacheNamespace::UserProfile, subject_id)
    }

    /// `meal:plan:{subject}`
    #[must_use]
    pub fn meal_plan(subject_id: &str) -> Self {
        Self::for_subject(CacheNamespace::MealPlan, subject_id)
    }

    /// `workout:plan:{subject}`
    #[must_use]
    pub fn workout_plan(subject_id: &str) -> Self {
        Self::for_subject(CacheNamespace::WorkoutPlan, subject_id)
    }

    /// `nutrition:logs:{subject}:{date}`
    #[must_use]
    pub fn nutrition_logs(subject_id: &str, date: NaiveDate) -> Self {
        Self::for_subject_on(CacheNamespace::NutritionLogs, subject_id, date)
    }

    /// `workout:logs:{subject}:{date}`
    #[must_use]
    pub fn workout_logs(subject_id: &str, date: NaiveDate) -> Self {
        Self::for_subject_on(CacheNamespace::WorkoutLogs, subject_id, date)
    }

    /// `ai:status:{generation_type}:{subject}`
    #[must_use]
    pub fn ai_generation_status(subject_id: &str, generation_type: &str) -> Self {
        Self(format!(
            "{}:{generation_type}:{subject_id}",
            CacheNamespace::AiGenerationStatus.prefix()
        ))
    }

    /// `session:{session_id}`
    #[must_use]
    pub fn session(session_id: &str) -> Self {
        Self::for_subject(CacheNamespace::Session, session_id)
    }

    /// Returns the key as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CacheKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Returns the index namespace of a raw key: its first two `:` segments, or
/// the first segment when the key has only one separator.
#[must_use]
pub fn key_namespace(key: &str) -> &str {
    let mut separators = key.match_indices(':').map(|(index, _)| index);
    match (separators.next(), separators.next()) {
        (Some(_), Some(second)) => &key[..second],
        (Some(first), None) => &key[..first],
        _ => key,
    }
}

/// Returns the set key indexing every live key of one namespace.
#[must_use]
pub fn namespace_index_key(namespace: &str) -> String {
    format!("{CACHE_INDEX_REGISTRY_KEY}:{namespace}")
}
