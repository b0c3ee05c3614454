use std::future::Future;
use std::marker::PhantomData;

use chrono::NaiveDate;
use fitgate_domain::{CacheKey, CacheNamespace, KeyPattern};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheService;

/// Cache of one value per subject, using the namespace's default tier.
pub struct SubjectCache<T> {
    cache: CacheService,
    namespace: CacheNamespace,
    value_type: PhantomData<fn() -> T>,
}

impl<T> Clone for SubjectCache<T> {
    fn clone(&self) -> Self {
        Self::new(self.cache.clone(), self.namespace)
    }
}

impl<T> SubjectCache<T> {
    pub(crate) fn new(cache: CacheService, namespace: CacheNamespace) -> Self {
        Self {
            cache,
            namespace,
            value_type: PhantomData,
        }
    }

    /// Namespace this cache writes to.
    #[must_use]
    pub fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    fn key(&self, subject_id: &str) -> CacheKey {
        CacheKey::for_subject(self.namespace, subject_id)
    }

    fn ttl_seconds(&self) -> u64 {
        self.namespace.default_tier().ttl_seconds()
    }
}

impl<T: Serialize + DeserializeOwned> SubjectCache<T> {
    /// Reads the subject's cached value.
    pub async fn get(&self, subject_id: &str) -> Option<T> {
        self.cache.get(self.key(subject_id).as_str()).await
    }

    /// Stores the subject's value.
    pub async fn set(&self, subject_id: &str, value: &T) {
        self.cache
            .set(self.key(subject_id).as_str(), value, self.ttl_seconds())
            .await;
    }

    /// Drops the subject's value.
    pub async fn invalidate(&self, subject_id: &str) {
        self.cache.delete(self.key(subject_id).as_str()).await;
    }

    /// Returns the cached value or computes and stores a fresh one.
    pub async fn get_or_compute<E, F, Fut>(&self, subject_id: &str, compute: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cache
            .get_or_compute(self.key(subject_id).as_str(), self.ttl_seconds(), compute)
            .await
    }
}

/// Cache of one value per subject and calendar day.
pub struct DatedSubjectCache<T> {
    cache: CacheService,
    namespace: CacheNamespace,
    value_type: PhantomData<fn() -> T>,
}

impl<T> Clone for DatedSubjectCache<T> {
    fn clone(&self) -> Self {
        Self::new(self.cache.clone(), self.namespace)
    }
}

impl<T> DatedSubjectCache<T> {
    pub(crate) fn new(cache: CacheService, namespace: CacheNamespace) -> Self {
        Self {
            cache,
            namespace,
            value_type: PhantomData,
        }
    }

    /// Namespace this cache writes to.
    #[must_use]
    pub fn namespace(&self) -> CacheNamespace {
        self.namespace
    }

    fn key(&self, subject_id: &str, date: NaiveDate) -> CacheKey {
        CacheKey::for_subject_on(self.namespace, subject_id, date)
    }

    fn ttl_seconds(&self) -> u64 {
        self.namespace.default_tier().ttl_seconds()
    }
}

impl<T: Serialize + DeserializeOwned> DatedSubjectCache<T> {
    /// Reads the subject's cached value for a day.
    pub async fn get(&self, subject_id: &str, date: NaiveDate) -> Option<T> {
        self.cache.get(self.key(subject_id, date).as_str()).await
    }

    /// Stores the subject's value for a day.
    pub async fn set(&self, subject_id: &str, date: NaiveDate, value: &T) {
        self.cache
            .set(
                self.key(subject_id, date).as_str(),
                value,
                self.ttl_seconds(),
            )
            .await;
    }

    /// Drops the subject's value for a day.
    pub async fn invalidate(&self, subject_id: &str, date: NaiveDate) {
        self.cache.delete(self.key(subject_id, date).as_str()).await;
    }

    /// Drops the subject's values for every day. Returns how many were removed.
    pub async fn invalidate_all(&self, subject_id: &str) -> usize {
        let pattern = format!(
            "{}:{}:*",
            self.namespace.prefix(),
            KeyPattern::escape(subject_id)
        );
        self.cache.delete_pattern(&pattern).await
    }

    /// Returns the cached value for a day or computes and stores a fresh one.
    pub async fn get_or_compute<E, F, Fut>(
        &self,
        subject_id: &str,
        date: NaiveDate,
        compute: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cache
            .get_or_compute(
                self.key(subject_id, date).as_str(),
                self.ttl_seconds(),
                compute,
            )
            .await
    }
}
