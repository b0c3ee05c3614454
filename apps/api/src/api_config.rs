use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use fitgate_core::AppError;
use fitgate_infrastructure::{
    DEFAULT_KEY_STORE_TIMEOUT, KeyStoreBackend, KeyStoreSettings,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub admin_token: Option<String>,
    pub key_store: KeyStoreSettings,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let admin_token = optional_env("ADMIN_TOKEN");

        let timeout = match optional_env("KEY_STORE_TIMEOUT_MS") {
            Some(value) => parse_timeout(value.as_str())?,
            None => DEFAULT_KEY_STORE_TIMEOUT,
        };

        let mut key_store = KeyStoreSettings::from_parts(
            optional_env("UPSTASH_REDIS_REST_URL").as_deref(),
            optional_env("UPSTASH_REDIS_REST_TOKEN").as_deref(),
            optional_env("REDIS_URL").as_deref(),
            timeout,
        )?;

        let in_memory = env::var("KEY_STORE_IN_MEMORY")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");
        if in_memory && key_store.backend() == &KeyStoreBackend::Disabled {
            key_store = KeyStoreSettings::new(KeyStoreBackend::InMemory, timeout);
        }

        Ok(Self {
            api_host,
            api_port,
            admin_token,
            key_store,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_timeout(value: &str) -> Result<Duration, AppError> {
    let millis = value.trim().parse::<u64>().map_err(|error| {
        AppError::Validation(format!("invalid KEY_STORE_TIMEOUT_MS '{value}': {error}"))
    })?;
    if millis == 0 {
        return Err(AppError::Validation(
            "KEY_STORE_TIMEOUT_MS must be greater than zero".to_owned(),
        ));
    }

    Ok(Duration::from_millis(millis))
}
