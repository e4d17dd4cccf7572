//! REST API server module.
//!
//! Exposes report analysis, the synthetic demo and the webhook settings
//! summary to the browser client.

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
