//! Fitgate API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use fitgate_core::AppError;
use fitgate_infrastructure::build_key_store;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let key_store = build_key_store(&config.key_store)?;

    if config.admin_token.is_none() {
        warn!("ADMIN_TOKEN is not set, admin routes will reject every request");
    }

    let app_state = AppState::new(
        key_store,
        config.key_store.backend().name(),
        config.admin_token.clone(),
    );
    let app = api_router::build_router(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "fitgate-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
