use std::sync::Arc;

use fitgate_application::{CacheService, KeyStore, RateLimitService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub rate_limit_service: RateLimitService,
    pub cache_service: CacheService,
    pub key_store: Arc<dyn KeyStore>,
    pub key_store_backend: &'static str,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        key_store: Arc<dyn KeyStore>,
        key_store_backend: &'static str,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            rate_limit_service: RateLimitService::new(key_store.clone()),
            cache_service: CacheService::new(key_store.clone()),
            key_store,
            key_store_backend,
            admin_token: admin_token.map(Arc::from),
        }
    }
}
