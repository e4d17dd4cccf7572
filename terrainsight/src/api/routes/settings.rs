//! Agent settings routes.
//!
//! The browser only learns which destinations exist, never their URLs.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::models::EnvSettingsResponse;
use crate::api::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/env", get(env_settings))
}

async fn env_settings(State(state): State<AppState>) -> Json<EnvSettingsResponse> {
    let settings = &state.settings;
    Json(EnvSettingsResponse {
        test_url_from_env: settings.webhooks.test_url_from_env(),
        production_configured: settings.webhooks.production_configured(),
        is_production: settings.is_production,
    })
}
