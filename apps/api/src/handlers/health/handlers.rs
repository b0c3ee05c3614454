use super::checks::check_key_store;
use super::*;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let key_store = check_key_store(state.key_store.as_ref()).await;

    // The limiter fails open, so a disabled store still serves traffic.
    let ready = key_store.status != "error";
    let status = if ready { "ok" } else { "degraded" };
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            ready,
            backend: state.key_store_backend,
            key_store,
        }),
    )
}
