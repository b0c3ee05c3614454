use async_trait::async_trait;
use fitgate_application::{KeyStore, KeyTtl};
use fitgate_core::{StoreResult, TransportError};

/// Stand-in used when no connection parameters were provided.
///
/// Services check [`KeyStore::is_configured`] before calling it, so every
/// operation here reports [`TransportError::Unconfigured`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredKeyStore;

#[async_trait]
impl KeyStore for UnconfiguredKeyStore {
    fn is_configured(&self) -> bool {
        false
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(TransportError::Unconfigured)
    }

    async fn set_with_expiry(
        &self,
        _key: &str,
        _value: &str,
        _ttl_seconds: u64,
    ) -> StoreResult<()> {
        Err(TransportError::Unconfigured)
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(TransportError::Unconfigured)
    }

    async fn increment(&self, _key: &str) -> StoreResult<i64> {
        Err(TransportError::Unconfigured)
    }

    async fn expire(&self, _key: &str, _ttl_seconds: u64) -> StoreResult<bool> {
        Err(TransportError::Unconfigured)
    }

    async fn ttl(&self, _key: &str) -> StoreResult<KeyTtl> {
        Err(TransportError::Unconfigured)
    }

    async fn ping(&self) -> StoreResult<()> {
        Err(TransportError::Unconfigured)
    }

    async fn add_member(&self, _set_key: &str, _member: &str) -> StoreResult<()> {
        Err(TransportError::Unconfigured)
    }

    async fn members(&self, _set_key: &str) -> StoreResult<Vec<String>> {
        Err(TransportError::Unconfigured)
    }

    async fn remove_member(&self, _set_key: &str, _member: &str) -> StoreResult<()> {
        Err(TransportError::Unconfigured)
    }
}
