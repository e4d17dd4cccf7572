//! Decides whether a finding is sent and drives the delivery.

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::delivery::{DeliveryEngine, DeliveryOutcome, DeliveryRequest};
use super::destination::{DestinationConfig, EnvironmentMode};
use super::payload::{NotificationPayload, NotifyContext};
use crate::analysis::Finding;

const TRIGGERS_DISABLED: &str = "Workflow triggers disabled";
const NO_DESTINATION: &str = "No webhook destination configured";

const NOT_FOUND_HINT: &str = "Make sure the n8n workflow is active so the production webhook is \
     listening, or click 'Execute workflow' before sending to a test webhook.";

/// Final state of one notification decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyState {
    /// Nothing was sent.
    Skipped,
    /// The endpoint answered 2xx.
    Delivered,
    /// A delivery was made and did not succeed.
    Failed,
}

/// What happened to a finding's notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyResult {
    pub state: NotifyState,
    pub mode: EnvironmentMode,
    pub outcome: DeliveryOutcome,
    pub skip_reason: Option<String>,
}

impl NotifyResult {
    fn skipped(mode: EnvironmentMode, reason: Option<String>) -> Self {
        Self {
            state: NotifyState::Skipped,
            mode,
            outcome: DeliveryOutcome::default(),
            skip_reason: reason,
        }
    }

    /// Whether a request reached the network.
    pub fn triggered(&self) -> bool {
        self.outcome.attempted
    }

    pub fn is_delivered(&self) -> bool {
        self.state == NotifyState::Delivered
    }
}

/// Applies the trigger policy and hands qualifying findings to the delivery engine.
#[derive(Clone)]
pub struct Notifier {
    engine: DeliveryEngine,
}

impl Notifier {
    pub fn new(engine: DeliveryEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &DeliveryEngine {
        &self.engine
    }

    pub async fn maybe_notify(
        &self,
        finding: &Finding,
        destination: &DestinationConfig,
        allow_trigger: bool,
        context: &NotifyContext,
    ) -> NotifyResult {
        self.maybe_notify_with_cancel(
            finding,
            destination,
            allow_trigger,
            context,
            CancellationToken::new(),
        )
        .await
    }

    /// Like [`maybe_notify`](Self::maybe_notify), aborting delivery when `cancel` fires.
    pub async fn maybe_notify_with_cancel(
        &self,
        finding: &Finding,
        destination: &DestinationConfig,
        allow_trigger: bool,
        context: &NotifyContext,
        cancel: CancellationToken,
    ) -> NotifyResult {
        let mode = destination.mode();

        if !finding.detected() {
            return NotifyResult::skipped(mode, None);
        }

        if !allow_trigger {
            debug!(subject = %context.subject, "Finding not sent: triggers disabled");
            return NotifyResult::skipped(mode, Some(TRIGGERS_DISABLED.to_string()));
        }

        let Some(endpoint) = destination.endpoint() else {
            let reason = match destination.resolution_error() {
                Some(error) => format!("{}: {}", NO_DESTINATION, error),
                None => NO_DESTINATION.to_string(),
            };
            info!(
                env_mode = %mode,
                subject = %context.subject,
                reason = %reason,
                "Finding not sent"
            );
            return NotifyResult::skipped(mode, Some(reason));
        };

        let payload = NotificationPayload::build(finding, context, Utc::now());
        let request = DeliveryRequest::new(endpoint.as_str(), &payload, mode).with_cancel(cancel);
        let mut outcome = self.engine.deliver_with_retry(&request).await;

        if outcome.final_status_code == 404 {
            outcome.push_hint(NOT_FOUND_HINT);
        }

        let state = if outcome.success {
            NotifyState::Delivered
        } else {
            NotifyState::Failed
        };

        NotifyResult {
            state,
            mode,
            outcome,
            skip_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use url::Url;

    use super::*;
    use crate::analysis::{DocumentMetadata, detect};
    use crate::config::{DeliveryPolicy, WebhookSettings};
    use crate::notification::delivery::{TransportError, TransportResponse, WebhookTransport};
    use crate::notification::destination::{Destination, resolve};

    /// Answers every request with a fixed status and records the payloads.
    struct RecordingTransport {
        status: u16,
        body: &'static str,
        sent: Mutex<Vec<NotificationPayload>>,
    }

    impl RecordingTransport {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<NotificationPayload> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WebhookTransport for RecordingTransport {
        async fn post_json(
            &self,
            _url: &Url,
            payload: &NotificationPayload,
        ) -> Result<TransportResponse, TransportError> {
            self.sent.lock().unwrap().push(payload.clone());
            Ok(TransportResponse::new(self.status, self.body))
        }
    }

    fn notifier(transport: Arc<RecordingTransport>) -> Notifier {
        Notifier::new(DeliveryEngine::new(transport, DeliveryPolicy::default()))
    }

    fn test_destination() -> DestinationConfig {
        DestinationConfig::new(
            EnvironmentMode::Test,
            Destination::Configured(Url::parse("http://localhost:5678/webhook-test/eco").unwrap()),
        )
    }

    fn crisis_finding() -> Finding {
        detect(
            "CRITICAL FAILURE: consumption 5000 above baseline",
            &DocumentMetadata::tabular(64, 1, vec!["energy_kwh".to_string()]),
        )
    }

    #[tokio::test]
    async fn test_undetected_finding_is_skipped_silently() {
        let transport = RecordingTransport::new(200, "");
        let result = notifier(transport.clone())
            .maybe_notify(
                &Finding::none(),
                &test_destination(),
                true,
                &NotifyContext::for_upload("clean.csv"),
            )
            .await;

        assert_eq!(result.state, NotifyState::Skipped);
        assert!(result.skip_reason.is_none());
        assert!(!result.triggered());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_triggers_disabled() {
        let transport = RecordingTransport::new(200, "");
        let result = notifier(transport.clone())
            .maybe_notify(
                &crisis_finding(),
                &test_destination(),
                false,
                &NotifyContext::for_upload("q1.csv"),
            )
            .await;

        assert_eq!(result.state, NotifyState::Skipped);
        assert_eq!(result.skip_reason.as_deref(), Some("Workflow triggers disabled"));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_destination_is_skipped() {
        let transport = RecordingTransport::new(200, "");
        let notifier = notifier(transport.clone());
        let context = NotifyContext::for_upload("q1.csv");

        let unconfigured = resolve(&WebhookSettings::default(), EnvironmentMode::Test, None);
        let result = notifier
            .maybe_notify(&crisis_finding(), &unconfigured, true, &context)
            .await;
        assert_eq!(result.state, NotifyState::Skipped);
        assert_eq!(
            result.skip_reason.as_deref(),
            Some("No webhook destination configured")
        );

        let production = resolve(&WebhookSettings::default(), EnvironmentMode::Production, None);
        let result = notifier
            .maybe_notify(&crisis_finding(), &production, true, &context)
            .await;
        assert_eq!(result.state, NotifyState::Skipped);
        assert_eq!(result.mode, EnvironmentMode::Production);
        let reason = result.skip_reason.unwrap();
        assert!(reason.starts_with("No webhook destination configured: "));
        assert!(reason.contains("N8N_WEBHOOK_PROD"));

        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_delivered() {
        let transport = RecordingTransport::new(200, "");
        let result = notifier(transport.clone())
            .maybe_notify(
                &crisis_finding(),
                &test_destination(),
                true,
                &NotifyContext::for_upload("q1.csv"),
            )
            .await;

        assert_eq!(result.state, NotifyState::Delivered);
        assert!(result.is_delivered());
        assert_eq!(result.outcome.final_status_code, 200);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].action, "sustainability_anomaly");
        assert!(sent[0].details.contains("q1.csv"));
        assert_eq!(sent[0].issues.len(), 3);
    }

    #[tokio::test]
    async fn test_not_found_gets_hint() {
        let transport = RecordingTransport::new(404, "webhook not registered");
        let result = notifier(transport.clone())
            .maybe_notify(
                &crisis_finding(),
                &test_destination(),
                true,
                &NotifyContext::for_demo("demo_critical_waste_analysis.csv"),
            )
            .await;

        assert_eq!(result.state, NotifyState::Failed);
        assert!(result.triggered());
        assert_eq!(result.outcome.final_status_code, 404);
        let detail = result.outcome.detail.unwrap();
        assert!(detail.starts_with("webhook not registered"));
        assert!(detail.contains("Execute workflow"));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.sent()[0].action, "demo_critical_analysis");
    }

    #[tokio::test]
    async fn test_cancelled_before_delivery() {
        let transport = RecordingTransport::new(200, "");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = notifier(transport.clone())
            .maybe_notify_with_cancel(
                &crisis_finding(),
                &test_destination(),
                true,
                &NotifyContext::for_upload("q1.csv"),
                cancel,
            )
            .await;

        assert_eq!(result.state, NotifyState::Failed);
        assert!(!result.triggered());
        assert!(transport.sent().is_empty());
    }
}
