//! Webhook delivery engine.
//!
//! A single attempt is a JSON POST bounded by a deadline and by the caller's
//! cancellation token. [`DeliveryEngine::deliver_with_retry`] adds exactly one
//! retry for failures where no response arrived or the server answered 5xx.
//!
//! Endpoints are only ever logged in masked form (`scheme://host/***`):
//! webhook paths commonly embed secret tokens.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::destination::EnvironmentMode;
use super::payload::NotificationPayload;
use crate::config::DeliveryPolicy;
use crate::utils::url::{mask_parsed, validate_webhook_url};

/// Longest response body excerpt surfaced as outcome detail.
const MAX_DETAIL_CHARS: usize = 1024;

/// Most bytes of a non-2xx response body read off the wire.
const MAX_BODY_BYTES: usize = MAX_DETAIL_CHARS * 4;

/// Shortest endpoint path fragment scrubbed from details.
const MIN_REDACTED_LEN: usize = 8;

const CANCELLED_DETAIL: &str = "Webhook request was cancelled";

/// Raw HTTP response as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Response body. Transports may leave this empty for 2xx responses.
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failure before any HTTP response was received.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest includes the full URL in its message; drop it before anything is logged.
        let err = err.without_url();
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self(message)
    }
}

/// Sends one JSON POST.
///
/// Implementations must not retry or apply their own deadline; the engine owns both.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &Url,
        payload: &NotificationPayload,
    ) -> Result<TransportResponse, TransportError>;
}

/// [`WebhookTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &Url,
        payload: &NotificationPayload,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(TransportResponse::new(status.as_u16(), String::new()));
        }

        let body = read_body_capped(response, MAX_BODY_BYTES).await;
        Ok(TransportResponse::new(status.as_u16(), body))
    }
}

/// Read at most `cap` bytes of the body; the rest is never pulled from the socket.
async fn read_body_capped(mut response: reqwest::Response, cap: usize) -> String {
    let mut buf = Vec::with_capacity(cap.min(8 * 1024));
    while buf.len() < cap {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(cap - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %TransportError::from(e), "Failed to read webhook response body");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Result of delivering one notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    /// Whether the request passed validation and was handed to the transport.
    pub attempted: bool,
    /// A 2xx response was received.
    pub success: bool,
    /// HTTP status of the last attempt; 0 when no response was received.
    pub final_status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Network attempts made (0–2).
    pub attempts: u8,
}

impl DeliveryOutcome {
    /// Outcome for a request that never left the process.
    pub fn not_attempted(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Default::default()
        }
    }

    fn no_response(attempts: u8, detail: impl Into<String>) -> Self {
        Self {
            attempted: true,
            success: false,
            final_status_code: 0,
            detail: Some(detail.into()),
            attempts,
        }
    }

    fn from_response(response: TransportResponse, attempts: u8, url: &Url) -> Self {
        let success = (200..300).contains(&response.status);
        Self {
            attempted: true,
            success,
            final_status_code: response.status,
            detail: (!success).then(|| redact(&response_detail(&response), url)),
            attempts,
        }
    }

    /// Append a remediation hint to the detail.
    pub fn push_hint(&mut self, hint: &str) {
        self.detail = Some(match self.detail.take() {
            Some(detail) if !detail.is_empty() => format!("{} {}", detail, hint),
            _ => hint.to_string(),
        });
    }
}

/// Whether a failed outcome deserves one more attempt: no response at all, or 5xx.
///
/// 4xx responses are configuration problems on the receiving side and are
/// never retried.
pub fn is_retriable(outcome: &DeliveryOutcome) -> bool {
    outcome.attempted
        && !outcome.success
        && (outcome.final_status_code == 0 || outcome.final_status_code >= 500)
}

/// One notification to deliver.
#[derive(Debug, Clone)]
pub struct DeliveryRequest<'a> {
    pub endpoint: &'a str,
    pub payload: &'a NotificationPayload,
    pub mode: EnvironmentMode,
    /// Aborts the in-flight attempt and suppresses the retry.
    pub cancel: CancellationToken,
}

impl<'a> DeliveryRequest<'a> {
    pub fn new(endpoint: &'a str, payload: &'a NotificationPayload, mode: EnvironmentMode) -> Self {
        Self {
            endpoint,
            payload,
            mode,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Bounded-time webhook delivery with a single retry.
#[derive(Clone)]
pub struct DeliveryEngine {
    transport: Arc<dyn WebhookTransport>,
    policy: DeliveryPolicy,
}

impl DeliveryEngine {
    pub fn new(transport: Arc<dyn WebhookTransport>, policy: DeliveryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Engine sending through `client`.
    pub fn with_client(client: reqwest::Client, policy: DeliveryPolicy) -> Self {
        Self::new(Arc::new(ReqwestTransport::new(client)), policy)
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Make a single attempt bounded by `deadline`.
    pub async fn deliver_once(
        &self,
        request: &DeliveryRequest<'_>,
        deadline: Duration,
    ) -> DeliveryOutcome {
        self.attempt(request, deadline, 1).await
    }

    /// Make one attempt and, if it is retriable, wait the retry delay and make
    /// exactly one more. The second outcome is returned whatever it is.
    pub async fn deliver_with_retry(&self, request: &DeliveryRequest<'_>) -> DeliveryOutcome {
        let first = self.attempt(request, self.policy.timeout, 1).await;
        if !is_retriable(&first) || request.cancel.is_cancelled() {
            return first;
        }

        warn!(
            env_mode = %request.mode,
            status = first.final_status_code,
            delay_ms = self.policy.retry_delay.as_millis() as u64,
            "Webhook attempt failed; retrying once"
        );

        tokio::select! {
            biased;
            _ = request.cancel.cancelled() => return first,
            _ = tokio::time::sleep(self.policy.retry_delay) => {}
        }

        self.attempt(request, self.policy.timeout, 2).await
    }

    async fn attempt(
        &self,
        request: &DeliveryRequest<'_>,
        deadline: Duration,
        attempt: u8,
    ) -> DeliveryOutcome {
        let url = match validate_webhook_url(request.endpoint) {
            Ok(url) => url,
            Err(reason) => {
                warn!(env_mode = %request.mode, reason = %reason, "Webhook not sent");
                return DeliveryOutcome::not_attempted(reason);
            }
        };

        if request.cancel.is_cancelled() {
            return DeliveryOutcome::not_attempted(CANCELLED_DETAIL);
        }

        let endpoint = mask_parsed(&url);
        debug!(env_mode = %request.mode, endpoint = %endpoint, attempt, "Sending webhook");

        // The deadline timer lives inside this future and is dropped with it on
        // every path: response, transport error, elapsed, or cancellation.
        let send = tokio::time::timeout(deadline, self.transport.post_json(&url, request.payload));

        let outcome = tokio::select! {
            biased;
            _ = request.cancel.cancelled() => {
                DeliveryOutcome::no_response(attempt, CANCELLED_DETAIL)
            }
            result = send => match result {
                Ok(Ok(response)) => DeliveryOutcome::from_response(response, attempt, &url),
                Ok(Err(error)) => {
                    warn!(
                        env_mode = %request.mode,
                        endpoint = %endpoint,
                        attempt,
                        error = %error,
                        "Webhook request failed"
                    );
                    DeliveryOutcome::no_response(attempt, redact(&error.0, &url))
                }
                Err(_) => DeliveryOutcome::no_response(attempt, timeout_detail(deadline)),
            },
        };

        info!(
            env_mode = %request.mode,
            endpoint = %endpoint,
            attempt,
            status = outcome.final_status_code,
            success = outcome.success,
            "Webhook trigger"
        );
        if let Some(detail) = outcome.detail.as_deref().filter(|_| !outcome.success) {
            debug!(endpoint = %endpoint, detail = %detail, "Webhook non-success detail");
        }

        outcome
    }
}

fn timeout_detail(deadline: Duration) -> String {
    format!(
        "Webhook did not respond in time ({}s). Set the n8n Webhook node's Response Mode to \
         \"Immediately\" so it answers before the workflow finishes.",
        deadline.as_secs()
    )
}

/// Human-readable cause extracted from a non-2xx response.
///
/// Structured bodies contribute their `message` and `hint` fields; anything
/// else is passed through as text, falling back to the status reason phrase.
fn response_detail(response: &TransportResponse) -> String {
    let body = response.body.trim();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        let field = |name: &str| {
            map.get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        match (field("message"), field("hint")) {
            (Some(message), Some(hint)) => {
                return truncate(&format!("{} {}", message, hint));
            }
            (Some(text), None) | (None, Some(text)) => return truncate(text),
            (None, None) => {}
        }
    }

    if !body.is_empty() {
        return truncate(body);
    }

    reqwest::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", response.status))
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Remove the endpoint path from text that may be shown to callers.
///
/// Fragments shorter than [`MIN_REDACTED_LEN`] are left alone so ordinary
/// words in the text survive.
fn redact(text: &str, url: &Url) -> String {
    let mut redacted = text.replace(url.as_str(), &mask_parsed(url));

    let path = url.path().trim_matches('/');
    if path.len() >= MIN_REDACTED_LEN {
        redacted = redacted.replace(path, "***");
    }
    if let Some(last) = url.path_segments().and_then(|mut s| s.next_back())
        && last.len() >= MIN_REDACTED_LEN
    {
        redacted = redacted.replace(last, "***");
    }
    redacted
}
