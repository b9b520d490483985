//! Route configuration.

use crate::auth::identity_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, patch, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Health check (intentionally unauthenticated for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check))
        // Avatar swaps
        .route(
            "/v1/profiles/{profile_id}/avatar",
            patch(handlers::update_profile_avatar),
        )
        .route(
            "/v1/accounts/{account_id}/avatar",
            patch(handlers::update_account_avatar),
        )
        // Deletions
        .route("/v1/accounts/{account_id}", delete(handlers::delete_account))
        .route("/v1/articles/{article_id}", delete(handlers::delete_article))
        .route("/v1/anime/{entry_id}", delete(handlers::delete_anime_entry))
        .route("/v1/albums/{album_id}", delete(handlers::delete_album))
        .route("/v1/diaries/{diary_id}", delete(handlers::delete_diary))
        // Site configuration
        .route(
            "/v1/settings/{key}",
            get(handlers::get_settings).patch(handlers::patch_settings),
        )
        // Admin endpoints (all require the admin role)
        .route("/v1/admin/gc/sweep", post(handlers::trigger_sweep))
        .route("/v1/admin/gc/registry", get(handlers::audit_registry));

    let mut router = Router::new().merge(api_routes);

    // SECURITY: When enabled, this endpoint MUST be network-restricted
    // to authorized Prometheus scraper IPs only.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    // Order of execution: TraceLayer -> identity -> handler
    router
        .layer(middleware::from_fn(identity_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
