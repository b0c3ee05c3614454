use async_trait::async_trait;
use fitgate_core::StoreResult;

/// Remaining lifetime of a key as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key expires after this many seconds.
    Expiring(u64),
    /// Key exists without expiry (`-1`).
    Persistent,
    /// Key does not exist (`-2`).
    Missing,
}

impl KeyTtl {
    /// Decodes the raw integer reply of a `TTL` command.
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        match u64::try_from(raw) {
            Ok(seconds) => Self::Expiring(seconds),
            Err(_) if raw == -1 => Self::Persistent,
            Err(_) => Self::Missing,
        }
    }

    /// Returns the remaining seconds when the key expires in the future.
    #[must_use]
    pub fn remaining_seconds(self) -> Option<u64> {
        match self {
            Self::Expiring(seconds) if seconds > 0 => Some(seconds),
            _ => None,
        }
    }
}

/// Transport port to the networked key-value store.
///
/// Implementations hold no business logic and never retry. Every call is
/// bounded by the adapter's request timeout.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Whether connection parameters were provided. An unconfigured store is
    /// the supported offline mode, not a failure.
    fn is_configured(&self) -> bool {
        true
    }

    /// Reads a string value.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes a value that expires after `ttl_seconds` (must be non-zero).
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()>;

    /// Removes a key. Missing keys are not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Atomically increments an integer counter, creating it at 1 without
    /// expiry when absent.
    async fn increment(&self, key: &str) -> StoreResult<i64>;

    /// Sets or replaces the expiry of an existing key. Returns `false` when
    /// the key does not exist.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool>;

    /// Reads the remaining lifetime of a key.
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// Liveness probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Adds a member to a set.
    async fn add_member(&self, set_key: &str, member: &str) -> StoreResult<()>;

    /// Lists the members of a set. Missing sets are empty.
    async fn members(&self, set_key: &str) -> StoreResult<Vec<String>>;

    /// Removes a member from a set.
    async fn remove_member(&self, set_key: &str, member: &str) -> StoreResult<()>;
}
