use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fitgate_application::{KeyStore, KeyTtl};
use fitgate_core::{StoreResult, TransportError};
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum StoredValue {
    Text(String),
    Members(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Every this many writes, all expired entries are evicted.
const SWEEP_INTERVAL: u64 = 256;

/// Process-local key store with Redis expiry semantics.
///
/// Expired keys are dropped when accessed and by a periodic sweep on the
/// write path. Runs against the tokio clock so paused-time tests can advance
/// past TTLs.
#[derive(Default)]
pub struct InMemoryKeyStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
    writes: AtomicU64,
}

impl InMemoryKeyStore {
    /// Creates an empty in-memory key store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Called with the write lock held, before the write is applied.
    fn sweep_if_due(&self, entries: &mut HashMap<String, StoredEntry>, now: Instant) {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_INTERVAL == 0 {
            entries.retain(|_, entry| entry.is_live(now));
        }
    }

    async fn evict_if_expired(&self, key: &str, now: Instant) {
        purge_expired(&mut *self.entries.write().await, key, now);
    }
}

fn wrong_type(key: &str) -> TransportError {
    TransportError::Command(format!(
        "WRONGTYPE operation against key '{key}' holding the wrong kind of value"
    ))
}

fn expiry_from(now: Instant, ttl_seconds: u64) -> Instant {
    now.checked_add(Duration::from_secs(ttl_seconds))
        .unwrap_or(now)
}

// Redis reports whole seconds rounded to the nearest second.
fn remaining_seconds(now: Instant, expires_at: Instant) -> u64 {
    let remaining_ms = expires_at.saturating_duration_since(now).as_millis();
    u64::try_from((remaining_ms + 500) / 1000).unwrap_or(u64::MAX)
}

fn purge_expired(entries: &mut HashMap<String, StoredEntry>, key: &str, now: Instant) {
    if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
        entries.remove(key);
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => {
                    return match &entry.value {
                        StoredValue::Text(value) => Ok(Some(value.clone())),
                        StoredValue::Members(_) => Err(wrong_type(key)),
                    };
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        self.evict_if_expired(key, now).await;
        Ok(None)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        if ttl_seconds == 0 {
            return Err(TransportError::Command(
                "invalid expire time in 'set' command".to_owned(),
            ));
        }

        let now = Instant::now();
        let expires_at = Some(expiry_from(now, ttl_seconds));
        let mut entries = self.entries.write().await;
        self.sweep_if_due(&mut entries, now);
        entries.insert(
            key.to_owned(),
            StoredEntry {
                value: StoredValue::Text(value.to_owned()),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str) -> StoreResult<i64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        self.sweep_if_due(&mut entries, now);
        purge_expired(&mut entries, key, now);

        let entry = entries
            .entry(key.to_owned())
            .or_insert_with(|| StoredEntry {
                value: StoredValue::Text("0".to_owned()),
                expires_at: None,
            });
        let StoredValue::Text(value) = &mut entry.value else {
            return Err(wrong_type(key));
        };

        let next = value
            .parse::<i64>()
            .ok()
            .and_then(|current| current.checked_add(1))
            .ok_or_else(|| {
                TransportError::Command(format!(
                    "value of '{key}' is not an integer or out of range"
                ))
            })?;
        *value = next.to_string();
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, key, now);

        if ttl_seconds == 0 {
            return Ok(entries.remove(key).is_some());
        }

        match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(expiry_from(now, ttl_seconds));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => {
                    return Ok(match entry.expires_at {
                        Some(expires_at) => KeyTtl::Expiring(remaining_seconds(now, expires_at)),
                        None => KeyTtl::Persistent,
                    });
                }
                Some(_) => {}
                None => return Ok(KeyTtl::Missing),
            }
        }

        self.evict_if_expired(key, now).await;
        Ok(KeyTtl::Missing)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn add_member(&self, set_key: &str, member: &str) -> StoreResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        self.sweep_if_due(&mut entries, now);
        purge_expired(&mut entries, set_key, now);

        let entry = entries
            .entry(set_key.to_owned())
            .or_insert_with(|| StoredEntry {
                value: StoredValue::Members(BTreeSet::new()),
                expires_at: None,
            });
        let StoredValue::Members(members) = &mut entry.value else {
            return Err(wrong_type(set_key));
        };
        members.insert(member.to_owned());
        Ok(())
    }

    async fn members(&self, set_key: &str) -> StoreResult<Vec<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(set_key) {
                Some(entry) if entry.is_live(now) => {
                    return match &entry.value {
                        StoredValue::Members(members) => Ok(members.iter().cloned().collect()),
                        StoredValue::Text(_) => Err(wrong_type(set_key)),
                    };
                }
                Some(_) => {}
                None => return Ok(Vec::new()),
            }
        }

        self.evict_if_expired(set_key, now).await;
        Ok(Vec::new())
    }

    async fn remove_member(&self, set_key: &str, member: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, set_key, Instant::now());

        let emptied = match entries.get_mut(set_key) {
            Some(StoredEntry {
                value: StoredValue::Members(members),
                ..
            }) => {
                members.remove(member);
                members.is_empty()
            }
            Some(_) => return Err(wrong_type(set_key)),
            None => false,
        };
        if emptied {
            entries.remove(set_key);
        }
        Ok(())
    }
}
