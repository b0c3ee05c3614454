//! Cache-aside access to the key store.
//!
//! Values are stored as JSON under namespaced keys. Reads degrade to a miss and
//! writes to a no-op whenever the store is unconfigured or failing, so callers
//! always fall through to their source of truth.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use fitgate_core::{StoreResult, TransportError};
use fitgate_domain::{
    CACHE_INDEX_REGISTRY_KEY, CacheNamespace, CacheTier, KeyPattern, key_namespace,
    namespace_index_key,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{DatedSubjectCache, KeyStore, KeyTtl, SubjectCache};

mod key_index;

/// Application service for JSON cache entries.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn KeyStore>,
    writes: Arc<AtomicU64>,
}

impl CacheService {
    /// Creates a new cache service.
    #[must_use]
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether entries are actually stored.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.store.is_configured()
    }

    /// Reads an entry, treating every failure as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(error) => {
                warn!(key, error = %error, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Reads an entry, surfacing transport and decoding failures.
    pub async fn try_get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        if !self.store.is_configured() {
            return Ok(None);
        }

        let Some(payload) = self.store.get(key).await? else {
            return Ok(None);
        };

        serde_json::from_str(&payload).map(Some).map_err(|error| {
            TransportError::Codec(format!("cached value under '{key}' does not decode: {error}"))
        })
    }

    /// Writes an entry. Failures are logged and dropped.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_seconds: u64) {
        if let Err(error) = self.try_set(key, value, ttl_seconds).await {
            warn!(key, ttl_seconds, error = %error, "cache write failed");
        }
    }

    /// Writes an entry with the default tier's TTL.
    pub async fn set_default<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.set(key, value, CacheTier::default().ttl_seconds())
            .await;
    }

    /// Writes an entry, surfacing transport and encoding failures.
    ///
    /// A zero TTL skips the write. Index bookkeeping failures are logged but do
    /// not fail the write.
    pub async fn try_set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> StoreResult<()> {
        if !self.store.is_configured() || ttl_seconds == 0 {
            return Ok(());
        }

        let payload = serde_json::to_string(value).map_err(|error| {
            TransportError::Codec(format!("value for '{key}' does not encode: {error}"))
        })?;
        self.store
            .set_with_expiry(key, &payload, ttl_seconds)
            .await?;

        if let Err(error) = self.track_key(key, ttl_seconds).await {
            warn!(key, error = %error, "failed to index cache key");
        }
        Ok(())
    }

    /// Removes one entry. Failures are logged and dropped.
    pub async fn delete(&self, key: &str) {
        if let Err(error) = self.try_delete(key).await {
            warn!(key, error = %error, "cache delete failed");
        }
    }

    /// Removes one entry, surfacing transport failures.
    pub async fn try_delete(&self, key: &str) -> StoreResult<()> {
        if !self.store.is_configured() {
            return Ok(());
        }

        self.store.delete(key).await?;
        if let Err(error) = self.untrack_key(key).await {
            warn!(key, error = %error, "failed to drop cache key from index");
        }
        Ok(())
    }

    /// Removes every indexed entry matching a glob pattern and returns how
    /// many were removed. Invalid patterns and failures remove nothing.
    pub async fn delete_pattern(&self, pattern: &str) -> usize {
        let pattern = match KeyPattern::parse(pattern) {
            Ok(pattern) => pattern,
            Err(error) => {
                warn!(pattern, error = %error, "rejected cache invalidation pattern");
                return 0;
            }
        };

        match self.try_delete_pattern(&pattern).await {
            Ok(removed) => removed,
            Err(error) => {
                warn!(
                    pattern = pattern.as_str(),
                    error = %error,
                    "cache pattern invalidation failed"
                );
                0
            }
        }
    }

    /// Returns the cached value or computes, stores and returns a fresh one.
    ///
    /// Compute errors are returned unchanged and nothing is written. A failed
    /// write still returns the computed value.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: u64,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(key).await {
            debug!(key, "cache hit");
            return Ok(cached);
        }

        let value = compute().await?;
        self.set(key, &value, ttl_seconds).await;
        Ok(value)
    }

    /// Typed cache for user profiles.
    #[must_use]
    pub fn user_profiles<T>(&self) -> SubjectCache<T> {
        SubjectCache::new(self.clone(), CacheNamespace::UserProfile)
    }

    /// Typed cache for meal plans.
    #[must_use]
    pub fn meal_plans<T>(&self) -> SubjectCache<T> {
        SubjectCache::new(self.clone(), CacheNamespace::MealPlan)
    }

    /// Typed cache for workout plans.
    #[must_use]
    pub fn workout_plans<T>(&self) -> SubjectCache<T> {
        SubjectCache::new(self.clone(), CacheNamespace::WorkoutPlan)
    }

    /// Typed cache for daily nutrition logs.
    #[must_use]
    pub fn nutrition_logs<T>(&self) -> DatedSubjectCache<T> {
        DatedSubjectCache::new(self.clone(), CacheNamespace::NutritionLogs)
    }

    /// Typed cache for daily workout logs.
    #[must_use]
    pub fn workout_logs<T>(&self) -> DatedSubjectCache<T> {
        DatedSubjectCache::new(self.clone(), CacheNamespace::WorkoutLogs)
    }
}
