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
        .route("/prompts", get(handlers::list_prompts))
        // Recording control
        .route("/session", get(handlers::get_session))
        .route("/session/start", post(handlers::start_session))
        .route("/session/stop", post(handlers::stop_session))
        // Inventory
        .route(
            "/recordings/:category",
            get(handlers::list_recordings).delete(handlers::clear_recordings),
        )
        .route(
            "/recording/:id",
            get(handlers::get_recording).delete(handlers::delete_recording),
        )
        .route("/recording/:id/audio", get(handlers::get_recording_audio))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
