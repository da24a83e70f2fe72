use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Interaction control
        .route("/interaction/begin", post(handlers::begin))
        .route("/interaction/end", post(handlers::end))
        .route("/interaction/replay", post(handlers::replay))
        // Interaction queries
        .route("/interaction/status", get(handlers::status))
        .route("/interaction/events", get(handlers::events))
        // Presentation layer may be served from another origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
