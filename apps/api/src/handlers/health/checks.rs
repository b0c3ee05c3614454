use super::*;

pub(super) async fn check_key_store(store: &dyn KeyStore) -> HealthDependencyStatus {
    if !store.is_configured() {
        return HealthDependencyStatus {
            status: "disabled",
            detail: Some("rate limits admit all requests and caching is off".to_owned()),
        };
    }

    match store.ping().await {
        Ok(()) => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("key store ping failed: {error}")),
        },
    }
}
