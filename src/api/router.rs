use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;

pub fn create_router(state: AppState) -> Router {
    // Public routes (no authentication)
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes (bearer token when API_TOKEN is set)
    let protected = Router::new()
        // Positions
        .route("/api/positions", get(handlers::positions::list).post(handlers::positions::create))
        .route(
            "/api/positions/:id",
            get(handlers::positions::detail).delete(handlers::positions::remove),
        )
        .route("/api/positions/:id/results", get(handlers::positions::results))
        // Control
        .route("/api/control/start", post(handlers::control::start))
        .route("/api/control/stop", post(handlers::control::stop))
        .route("/api/control/status", get(handlers::control::status))
        // WebSocket
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

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
