//! HTTP module: the gateway endpoint plus health, status, and shutdown.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
