//! HTTP route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{health, liveness, shutdown, status, ussd_turn, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Gateway endpoint: POST for turns, GET for a liveness string
        .route("/ussd", post(ussd_turn).get(liveness))
        // Health endpoints
        .route("/health", get(health))
        .route("/api/v1/status", get(status))
        // Drains the server and closes the persistence pool
        .route("/shutdown", post(shutdown))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
