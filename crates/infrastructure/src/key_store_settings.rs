//! Key store selection from connection parameters.

use std::sync::Arc;
use std::time::Duration;

use fitgate_application::KeyStore;
use fitgate_core::{AppError, AppResult};
use tracing::{info, warn};
use url::Url;

use crate::store_timeout::DEFAULT_KEY_STORE_TIMEOUT;
use crate::{InMemoryKeyStore, RedisKeyStore, UnconfiguredKeyStore, UpstashRestKeyStore};

/// Which key store backs the services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreBackend {
    /// No connection parameters. Limits admit everything and caching is off.
    Disabled,
    /// Upstash REST endpoint with bearer token.
    Rest {
        /// Command endpoint.
        endpoint: Url,
        /// Bearer token.
        token: String,
    },
    /// Redis server reached over RESP.
    Redis {
        /// Connection URL such as `redis://localhost:6379`.
        url: String,
    },
    /// Process-local store, for local runs without a server.
    InMemory,
}

impl KeyStoreBackend {
    /// Short name for logs and health output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Rest { .. } => "upstash-rest",
            Self::Redis { .. } => "redis",
            Self::InMemory => "in-memory",
        }
    }
}

/// Validated key store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStoreSettings {
    backend: KeyStoreBackend,
    timeout: Duration,
}

impl Default for KeyStoreSettings {
    fn default() -> Self {
        Self {
            backend: KeyStoreBackend::Disabled,
            timeout: DEFAULT_KEY_STORE_TIMEOUT,
        }
    }
}

impl KeyStoreSettings {
    /// Creates settings for an explicit backend.
    #[must_use]
    pub fn new(backend: KeyStoreBackend, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Resolves the backend from raw connection parameters.
    ///
    /// A complete REST pair wins over `redis_url`. Blank values count as
    /// absent and a REST pair with only one half set is ignored.
    pub fn from_parts(
        rest_url: Option<&str>,
        rest_token: Option<&str>,
        redis_url: Option<&str>,
        timeout: Duration,
    ) -> AppResult<Self> {
        if timeout.is_zero() {
            return Err(AppError::Validation(
                "key store timeout must be greater than zero".to_owned(),
            ));
        }

        let rest_url = non_blank(rest_url);
        let rest_token = non_blank(rest_token);
        let redis_url = non_blank(redis_url);

        let backend = match (rest_url, rest_token) {
            (Some(endpoint), Some(token)) => KeyStoreBackend::Rest {
                endpoint: parse_rest_endpoint(endpoint)?,
                token: token.to_owned(),
            },
            (rest_url, rest_token) => {
                if rest_url.is_some() || rest_token.is_some() {
                    warn!(
                        has_url = rest_url.is_some(),
                        has_token = rest_token.is_some(),
                        "incomplete key store REST configuration ignored"
                    );
                }

                match redis_url {
                    Some(url) => KeyStoreBackend::Redis {
                        url: parse_redis_url(url)?,
                    },
                    None => KeyStoreBackend::Disabled,
                }
            }
        };

        Ok(Self::new(backend, timeout))
    }

    /// Selected backend.
    #[must_use]
    pub fn backend(&self) -> &KeyStoreBackend {
        &self.backend
    }

    /// Per-call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_rest_endpoint(raw: &str) -> AppResult<Url> {
    let endpoint = Url::parse(raw).map_err(|error| {
        AppError::Validation(format!("invalid key store REST url '{raw}': {error}"))
    })?;

    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "key store REST url must use http or https, got '{}'",
            endpoint.scheme()
        )));
    }

    Ok(endpoint)
}

fn parse_redis_url(raw: &str) -> AppResult<String> {
    let url = Url::parse(raw)
        .map_err(|error| AppError::Validation(format!("invalid redis url: {error}")))?;

    if !matches!(url.scheme(), "redis" | "rediss" | "redis+unix" | "unix") {
        return Err(AppError::Validation(format!(
            "redis url must use a redis scheme, got '{}'",
            url.scheme()
        )));
    }

    Ok(raw.to_owned())
}

/// Builds the key store shared by the rate limiter and the cache.
pub fn build_key_store(settings: &KeyStoreSettings) -> AppResult<Arc<dyn KeyStore>> {
    let timeout = settings.timeout();
    let store: Arc<dyn KeyStore> = match settings.backend() {
        KeyStoreBackend::Disabled => {
            warn!("key store is not configured, rate limits admit all requests and caching is off");
            Arc::new(UnconfiguredKeyStore)
        }
        KeyStoreBackend::Rest { endpoint, token } => {
            let http_client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|error| {
                    AppError::Internal(format!("failed to build key store http client: {error}"))
                })?;
            Arc::new(UpstashRestKeyStore::new(
                http_client,
                endpoint.clone(),
                token.as_str(),
                timeout,
            ))
        }
        KeyStoreBackend::Redis { url } => Arc::new(
            RedisKeyStore::open(url, timeout)
                .map_err(|error| AppError::Validation(error.to_string()))?,
        ),
        KeyStoreBackend::InMemory => Arc::new(InMemoryKeyStore::new()),
    };

    info!(
        backend = settings.backend().name(),
        timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        "key store ready"
    );
    Ok(store)
}
