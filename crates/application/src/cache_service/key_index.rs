use std::sync::atomic::Ordering;

use super::*;

/// Every this many writes, the written key's namespace index drops members
/// whose entry has expired.
pub(super) const INDEX_SWEEP_INTERVAL: u64 = 32;

impl CacheService {
    /// Removes every indexed entry matching `pattern`, surfacing failures.
    ///
    /// Only keys written through [`CacheService::set`] are visible. The
    /// namespace registry is left intact so concurrent writes stay reachable.
    pub async fn try_delete_pattern(&self, pattern: &KeyPattern) -> StoreResult<usize> {
        if !self.store.is_configured() {
            return Ok(0);
        }

        let namespaces = self.store.members(CACHE_INDEX_REGISTRY_KEY).await?;
        let mut removed = 0;

        for namespace in namespaces
            .iter()
            .filter(|namespace| pattern.may_match_namespace(namespace))
        {
            let index_key = namespace_index_key(namespace);
            let keys = self.store.members(&index_key).await?;

            for key in keys.iter().filter(|key| pattern.matches(key)) {
                self.store.delete(key).await?;
                self.store.remove_member(&index_key, key).await?;
                removed += 1;
            }
        }

        debug!(pattern = pattern.as_str(), removed, "cache pattern invalidated");
        Ok(removed)
    }

    pub(super) async fn track_key(&self, key: &str, ttl_seconds: u64) -> StoreResult<()> {
        let namespace = key_namespace(key);
        let index_key = namespace_index_key(namespace);
        let index_ttl = ttl_seconds.max(CacheTier::Day.ttl_seconds());

        self.store
            .add_member(CACHE_INDEX_REGISTRY_KEY, namespace)
            .await?;
        self.store.add_member(&index_key, key).await?;

        self.extend_expiry(&index_key, index_ttl).await?;
        self.extend_expiry(CACHE_INDEX_REGISTRY_KEY, index_ttl)
            .await?;

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % INDEX_SWEEP_INTERVAL == 0 {
            let pruned = self.sweep_index(&index_key).await?;
            debug!(index_key = %index_key, pruned, "swept cache index");
        }
        Ok(())
    }

    pub(super) async fn untrack_key(&self, key: &str) -> StoreResult<()> {
        let index_key = namespace_index_key(key_namespace(key));
        self.store.remove_member(&index_key, key).await
    }

    async fn sweep_index(&self, index_key: &str) -> StoreResult<usize> {
        let mut pruned = 0;
        for key in self.store.members(index_key).await? {
            if self.store.ttl(&key).await? == KeyTtl::Missing {
                self.store.remove_member(index_key, &key).await?;
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    // Index sets must outlive every key they list, so expiry only grows.
    async fn extend_expiry(&self, key: &str, ttl_seconds: u64) -> StoreResult<()> {
        let needs_extension = match self.store.ttl(key).await? {
            KeyTtl::Expiring(remaining) => remaining < ttl_seconds,
            KeyTtl::Persistent => true,
            KeyTtl::Missing => false,
        };

        if needs_extension {
            self.store.expire(key, ttl_seconds).await?;
        }
        Ok(())
    }
}
