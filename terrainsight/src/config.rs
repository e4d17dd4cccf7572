//! Process configuration.
//!
//! Loaded once at startup from environment variables (after `.env` has been
//! applied by `dotenvy`) and shared read-only afterwards.

use std::time::Duration;

use crate::utils::url::validate_webhook_url;

/// Default per-attempt webhook timeout.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause before the single webhook retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(800);

/// Server-side webhook destinations.
///
/// The production URL is a secret: it must only leave this struct as a
/// boolean (see [`WebhookSettings::production_configured`]).
#[derive(Clone, Default)]
pub struct WebhookSettings {
    /// `N8N_WEBHOOK_PROD`
    pub production_url: Option<String>,
    /// `N8N_WEBHOOK_TEST`
    pub test_url: Option<String>,
}

impl std::fmt::Debug for WebhookSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSettings")
            .field("production_configured", &self.production_configured())
            .field("test_url_from_env", &self.test_url_from_env())
            .finish()
    }
}

impl WebhookSettings {
    /// Load destinations from `N8N_WEBHOOK_PROD` / `N8N_WEBHOOK_TEST`.
    pub fn from_env() -> Self {
        Self {
            production_url: non_empty_env("N8N_WEBHOOK_PROD"),
            test_url: non_empty_env("N8N_WEBHOOK_TEST"),
        }
    }

    /// Whether a production destination is present. Safe to expose.
    pub fn production_configured(&self) -> bool {
        self.production_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Whether the test destination comes from the server environment. Safe to expose.
    pub fn test_url_from_env(&self) -> bool {
        self.test_url
            .as_deref()
            .is_some_and(|url| validate_webhook_url(url).is_ok())
    }
}

/// Timing knobs for webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Deadline for a single attempt, including reading the response body.
    pub timeout: Duration,
    /// Pause before the retry of a retriable failure.
    pub retry_delay: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl DeliveryPolicy {
    /// Supported env vars:
    /// - `WEBHOOK_TIMEOUT_SECS` (e.g. "30")
    /// - `WEBHOOK_RETRY_DELAY_MS` (e.g. "800")
    pub fn from_env_or_default() -> Self {
        let mut policy = Self::default();

        if let Ok(secs) = std::env::var("WEBHOOK_TIMEOUT_SECS")
            && let Ok(parsed) = secs.trim().parse::<u64>()
            && parsed > 0
        {
            policy.timeout = Duration::from_secs(parsed);
        }

        if let Ok(ms) = std::env::var("WEBHOOK_RETRY_DELAY_MS")
            && let Ok(parsed) = ms.trim().parse::<u64>()
        {
            policy.retry_delay = Duration::from_millis(parsed);
        }

        policy
    }
}

/// Application settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub webhooks: WebhookSettings,
    pub delivery: DeliveryPolicy,
    /// Deployment flag reported by the settings endpoint (`VERCEL=1` or `APP_ENV=production`).
    pub is_production: bool,
}

impl Settings {
    /// Load all settings from the environment.
    pub fn from_env() -> Self {
        let is_production = std::env::var("VERCEL").is_ok_and(|v| v.trim() == "1")
            || std::env::var("APP_ENV")
                .is_ok_and(|v| v.trim().eq_ignore_ascii_case("production"));

        Self {
            webhooks: WebhookSettings::from_env(),
            delivery: DeliveryPolicy::from_env_or_default(),
            is_production,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
