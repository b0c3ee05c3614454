use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/api/admin/rate-limits/{action}/{subject_id}",
            delete(handlers::rate_limits::reset_rate_limit_handler),
        )
        .route(
            "/api/admin/cache/keys/{key}",
            delete(handlers::cache::delete_cache_key_handler),
        )
        .route(
            "/api/admin/cache/invalidate",
            post(handlers::cache::invalidate_cache_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_admin_token,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/api/rate-limits/{action}/{subject_id}/check",
            post(handlers::rate_limits::check_rate_limit_handler),
        )
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
