//! Webhook destination resolution.
//!
//! Production deliveries may only go to the server-configured endpoint. Test
//! mode additionally accepts a URL supplied by the client, which is a trust
//! relaxation that must never apply to production.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::config::WebhookSettings;
use crate::utils::url::{mask_url, validate_webhook_url};
use crate::{Error, Result};

static CLIENT_FALLBACK_WARNED: AtomicBool = AtomicBool::new(false);

/// Which destination set a request targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentMode {
    #[default]
    Test,
    #[serde(rename = "prod", alias = "production")]
    Production,
}

impl EnvironmentMode {
    /// Parse a client-supplied mode. Anything other than `prod`/`production` is test.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("prod") | Some("production") => Self::Production,
            _ => Self::Test,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Production => "prod",
        }
    }
}

impl std::fmt::Display for EnvironmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution result for one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A validated http(s) endpoint.
    Configured(Url),
    /// Nothing to send to; acceptable in test mode.
    NotConfigured,
    /// A configuration fault that blocks delivery.
    Misconfigured(String),
}

/// Resolved destination for an environment mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationConfig {
    mode: EnvironmentMode,
    destination: Destination,
}

impl DestinationConfig {
    pub fn new(mode: EnvironmentMode, destination: Destination) -> Self {
        Self { mode, destination }
    }

    pub fn mode(&self) -> EnvironmentMode {
        self.mode
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn endpoint(&self) -> Option<&Url> {
        match &self.destination {
            Destination::Configured(url) => Some(url),
            _ => None,
        }
    }

    pub fn resolution_error(&self) -> Option<&str> {
        match &self.destination {
            Destination::Misconfigured(reason) => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Fail with a configuration error when the destination is misconfigured.
    ///
    /// `NotConfigured` is fine: it only means there is nowhere to send to.
    pub fn ensure_usable(&self) -> Result<()> {
        match &self.destination {
            Destination::Misconfigured(reason) => Err(Error::config(reason.clone())),
            _ => Ok(()),
        }
    }
}

/// Resolve the webhook destination for `mode`.
pub fn resolve(
    settings: &WebhookSettings,
    mode: EnvironmentMode,
    client_fallback: Option<&str>,
) -> DestinationConfig {
    let destination = match mode {
        EnvironmentMode::Production => resolve_production(settings),
        EnvironmentMode::Test => resolve_test(settings, client_fallback),
    };
    DestinationConfig::new(mode, destination)
}

fn resolve_production(settings: &WebhookSettings) -> Destination {
    let Some(raw) = settings
        .production_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    else {
        return Destination::Misconfigured(
            "Production webhook not configured on server (set N8N_WEBHOOK_PROD)".to_string(),
        );
    };

    match validate_webhook_url(raw) {
        Ok(url) => Destination::Configured(url),
        Err(reason) => {
            warn!(
                endpoint = %mask_url(raw),
                reason = %reason,
                "Ignoring invalid production webhook URL"
            );
            Destination::Misconfigured(format!(
                "Production webhook URL is invalid (check N8N_WEBHOOK_PROD): {}",
                reason
            ))
        }
    }
}

fn resolve_test(settings: &WebhookSettings, client_fallback: Option<&str>) -> Destination {
    if let Some(raw) = settings.test_url.as_deref().map(str::trim)
        && !raw.is_empty()
    {
        match validate_webhook_url(raw) {
            Ok(url) => return Destination::Configured(url),
            Err(reason) => warn!(
                endpoint = %mask_url(raw),
                reason = %reason,
                "Ignoring invalid N8N_WEBHOOK_TEST URL"
            ),
        }
    }

    let Some(raw) = client_fallback.map(str::trim).filter(|s| !s.is_empty()) else {
        return Destination::NotConfigured;
    };

    match validate_webhook_url(raw) {
        Ok(url) => {
            if !CLIENT_FALLBACK_WARNED.swap(true, Ordering::Relaxed) {
                warn!(
                    endpoint = %mask_url(raw),
                    "N8N_WEBHOOK_TEST not set; using client-provided test webhook URL"
                );
            }
            Destination::Configured(url)
        }
        Err(reason) => {
            warn!(
                endpoint = %mask_url(raw),
                reason = %reason,
                "Ignoring invalid client-provided test webhook URL"
            );
            Destination::NotConfigured
        }
    }
}
