use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use fitgate_core::{StoreResult, TransportError};

use crate::{KeyStore, KeyTtl};

#[derive(Debug, Clone)]
enum StoredValue {
    Text(String),
    Members(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct StoredEntry {
    value: StoredValue,
    expires_at: Option<u64>,
}

type Interleaving = Box<dyn FnOnce(&mut FakeState) + Send>;

#[derive(Default)]
pub(crate) struct FakeState {
    now: u64,
    entries: HashMap<String, StoredEntry>,
    failing_operations: HashSet<&'static str>,
    fail_everything: bool,
    calls: Vec<&'static str>,
    interleavings: Vec<(&'static str, Interleaving)>,
}

impl FakeState {
    /// Another writer's `SET key value EX ttl`.
    pub(crate) fn put_text(&mut self, key: &str, value: &str, ttl_seconds: u64) {
        let expires_at = Some(self.now + ttl_seconds);
        self.entries.insert(
            key.to_owned(),
            StoredEntry {
                value: StoredValue::Text(value.to_owned()),
                expires_at,
            },
        );
    }

    /// Another writer's `SADD set_key member`.
    pub(crate) fn add_to_set(&mut self, set_key: &str, member: &str) {
        let entry = self
            .entries
            .entry(set_key.to_owned())
            .or_insert_with(|| StoredEntry {
                value: StoredValue::Members(BTreeSet::new()),
                expires_at: None,
            });
        if let StoredValue::Members(members) = &mut entry.value {
            members.insert(member.to_owned());
        }
    }

    /// Another caller's `INCR key`, keeping any expiry.
    pub(crate) fn bump_counter(&mut self, key: &str) {
        let entry = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| StoredEntry {
                value: StoredValue::Text("0".to_owned()),
                expires_at: None,
            });
        if let StoredValue::Text(value) = &mut entry.value {
            let next = value.parse::<i64>().unwrap_or_default() + 1;
            *value = next.to_string();
        }
    }
}

/// Hand-rolled key store with a manual clock and fault injection.
pub(crate) struct FakeKeyStore {
    configured: bool,
    state: Mutex<FakeState>,
}

impl FakeKeyStore {
    pub(crate) fn new() -> Self {
        Self {
            configured: true,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub(crate) fn unconfigured() -> Self {
        Self {
            configured: false,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub(crate) fn advance(&self, seconds: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.now += seconds;
        }
    }

    pub(crate) fn fail_on(&self, operation: &'static str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_operations.insert(operation);
        }
    }

    pub(crate) fn fail_everything(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_everything = true;
        }
    }

    pub(crate) fn recover(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_everything = false;
            state.failing_operations.clear();
        }
    }

    /// Runs `write` right before the next `operation` call is served.
    pub(crate) fn interleave_before(
        &self,
        operation: &'static str,
        write: impl FnOnce(&mut FakeState) + Send + 'static,
    ) {
        if let Ok(mut state) = self.state.lock() {
            state.interleavings.push((operation, Box::new(write)));
        }
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    pub(crate) fn count_calls(&self, operation: &str) -> usize {
        self.calls()
            .into_iter()
            .filter(|call| *call == operation)
            .count()
    }

    pub(crate) fn raw_value(&self, key: &str) -> Option<String> {
        let state = self.state.lock().ok()?;
        match live_entry(&state, key).map(|entry| entry.value.clone()) {
            Some(StoredValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn put_without_expiry(&self, key: &str, value: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.insert(
                key.to_owned(),
                StoredEntry {
                    value: StoredValue::Text(value.to_owned()),
                    expires_at: None,
                },
            );
        }
    }

    fn with_state<T>(
        &self,
        operation: &'static str,
        action: impl FnOnce(&mut FakeState) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|error| TransportError::Command(format!("fake store poisoned: {error}")))?;
        state.calls.push(operation);

        if state.fail_everything || state.failing_operations.contains(operation) {
            return Err(TransportError::Connection(format!(
                "simulated outage during {operation}"
            )));
        }

        let now = state.now;
        state
            .entries
            .retain(|_, entry| entry.expires_at.is_none_or(|expires_at| expires_at > now));

        if let Some(position) = state
            .interleavings
            .iter()
            .position(|(pending, _)| *pending == operation)
        {
            let (_, write) = state.interleavings.remove(position);
            write(&mut *state);
        }
        action(&mut state)
    }
}

fn live_entry<'a>(state: &'a FakeState, key: &str) -> Option<&'a StoredEntry> {
    state
        .entries
        .get(key)
        .filter(|entry| entry.expires_at.is_none_or(|expires_at| expires_at > state.now))
}

fn wrong_type() -> TransportError {
    TransportError::Command(
        "WRONGTYPE operation against a key holding the wrong kind of value".to_owned(),
    )
}

#[async_trait]
impl KeyStore for FakeKeyStore {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_state("get", |state| match state.entries.get(key) {
            None => Ok(None),
            Some(StoredEntry {
                value: StoredValue::Text(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type()),
        })
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        self.with_state("set_with_expiry", |state| {
            if ttl_seconds == 0 {
                return Err(TransportError::Command("invalid expire time".to_owned()));
            }
            let expires_at = Some(state.now + ttl_seconds);
            state.entries.insert(
                key.to_owned(),
                StoredEntry {
                    value: StoredValue::Text(value.to_owned()),
                    expires_at,
                },
            );
            Ok(())
        })
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.with_state("delete", |state| {
            state.entries.remove(key);
            Ok(())
        })
    }

    async fn increment(&self, key: &str) -> StoreResult<i64> {
        self.with_state("increment", |state| {
            let entry = state
                .entries
                .entry(key.to_owned())
                .or_insert_with(|| StoredEntry {
                    value: StoredValue::Text("0".to_owned()),
                    expires_at: None,
                });
            let StoredValue::Text(value) = &mut entry.value else {
                return Err(wrong_type());
            };
            let next = value
                .parse::<i64>()
                .map_err(|_| TransportError::Command("value is not an integer".to_owned()))?
                + 1;
            *value = next.to_string();
            Ok(next)
        })
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        self.with_state("expire", |state| {
            let now = state.now;
            match state.entries.get_mut(key) {
                Some(entry) => {
                    entry.expires_at = Some(now + ttl_seconds);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        self.with_state("ttl", |state| {
            Ok(match state.entries.get(key) {
                None => KeyTtl::Missing,
                Some(StoredEntry {
                    expires_at: None, ..
                }) => KeyTtl::Persistent,
                Some(StoredEntry {
                    expires_at: Some(expires_at),
                    ..
                }) => KeyTtl::Expiring(expires_at - state.now),
            })
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        self.with_state("ping", |_| Ok(()))
    }

    async fn add_member(&self, set_key: &str, member: &str) -> StoreResult<()> {
        self.with_state("add_member", |state| {
            let entry = state
                .entries
                .entry(set_key.to_owned())
                .or_insert_with(|| StoredEntry {
                    value: StoredValue::Members(BTreeSet::new()),
                    expires_at: None,
                });
            let StoredValue::Members(members) = &mut entry.value else {
                return Err(wrong_type());
            };
            members.insert(member.to_owned());
            Ok(())
        })
    }

    async fn members(&self, set_key: &str) -> StoreResult<Vec<String>> {
        self.with_state("members", |state| match state.entries.get(set_key) {
            None => Ok(Vec::new()),
            Some(StoredEntry {
                value: StoredValue::Members(members),
                ..
            }) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(wrong_type()),
        })
    }

    async fn remove_member(&self, set_key: &str, member: &str) -> StoreResult<()> {
        self.with_state("remove_member", |state| {
            let emptied = match state.entries.get_mut(set_key) {
                Some(StoredEntry {
                    value: StoredValue::Members(members),
                    ..
                }) => {
                    members.remove(member);
                    members.is_empty()
                }
                Some(_) => return Err(wrong_type()),
                None => false,
            };
            if emptied {
                state.entries.remove(set_key);
            }
            Ok(())
        })
    }
}
