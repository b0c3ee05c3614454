//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_key_store;
mod key_store_settings;
mod redis_key_store;
mod store_timeout;
mod unconfigured_key_store;
mod upstash_rest_key_store;

pub use in_memory_key_store::InMemoryKeyStore;
pub use key_store_settings::{KeyStoreBackend, KeyStoreSettings, build_key_store};
pub use redis_key_store::RedisKeyStore;
pub use store_timeout::DEFAULT_KEY_STORE_TIMEOUT;
pub use unconfigured_key_store::UnconfiguredKeyStore;
pub use upstash_rest_key_store::UpstashRestKeyStore;
