//! API route modules.

pub mod analyze;
pub mod demo;
pub mod health;
pub mod settings;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/health", health::router())
        .nest("/api/agent-settings", settings::router())
        .nest("/api/analyze", analyze::router())
        .nest("/api/demo", demo::router())
        .with_state(state)
}
