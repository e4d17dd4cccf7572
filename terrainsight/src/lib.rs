//! terrainsight library crate.
//!
//! Detects sustainability anomalies in extracted report content and notifies
//! an n8n workflow about them over a webhook.

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod notification;
pub mod utils;

pub use error::{Error, Result};
