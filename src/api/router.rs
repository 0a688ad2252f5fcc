use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes, no authentication required
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected routes require a Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Subscription registry
        .route(
            "/api/subscriptions",
            get(handlers::subscriptions::list).post(handlers::subscriptions::create),
        )
        .route(
            "/api/subscriptions/:subscriber_id/:wallet",
            patch(handlers::subscriptions::update).delete(handlers::subscriptions::remove),
        )
        // Control
        .route("/api/control/status", get(handlers::control::status))
        .route("/api/control/pause", post(handlers::control::pause))
        .route("/api/control/resume", post(handlers::control::resume))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // CORS: direct API access is gated by the bearer token, not the origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
