//! HTTP handlers.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Form, Json};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::menu::{MenuEngine, UssdRequest};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// The menu session engine.
    pub engine: Arc<MenuEngine>,
    /// Signals the server to drain and the pool to close.
    pub shutdown: mpsc::Sender<()>,
}

impl AppState {
    /// Create new app state.
    pub fn new(engine: Arc<MenuEngine>, shutdown: mpsc::Sender<()>) -> Self {
        Self { engine, shutdown }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Sessions currently in flight.
    pub live_sessions: usize,
}

/// Gateway turn handler. Always replies 200 with `CON `/`END ` text;
/// failures inside the engine surface as a terminal maintenance message,
/// never as an HTTP error the gateway would mangle.
pub async fn ussd_turn(State(state): State<AppState>, Form(req): Form<UssdRequest>) -> String {
    state.engine.handle_turn(&req).await
}

/// Liveness probe on the gateway path.
pub async fn liveness() -> &'static str {
    "USSD BMI service is running"
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Status handler - returns session counts.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        status: "running",
        live_sessions: state.engine.live_sessions(),
    })
}

/// Shutdown handler - asks the server to drain and close the pool.
pub async fn shutdown(State(state): State<AppState>) -> &'static str {
    info!("shutdown requested");
    let _ = state.shutdown.send(()).await;
    "shutting down"
}
