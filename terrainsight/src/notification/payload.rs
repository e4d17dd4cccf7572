//! Outbound webhook payload.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::analysis::{Finding, Severity};

/// Source identifier for notifications raised by uploaded report analysis.
pub const ANALYSIS_SOURCE: &str = "terrainsight_analysis";

/// What a notification is about, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyContext {
    /// Workflow action name, e.g. `sustainability_anomaly`.
    pub action: String,
    /// Static identifier of the producing subsystem.
    pub source: String,
    /// Prefix of the `details` line.
    pub label: String,
    /// File name or other subject of the finding.
    pub subject: String,
    /// Marks the payload as a crisis alert for workflow routing.
    pub critical: bool,
}

impl NotifyContext {
    /// Context for an uploaded report.
    pub fn for_upload(filename: impl Into<String>) -> Self {
        Self {
            action: "sustainability_anomaly".to_string(),
            source: ANALYSIS_SOURCE.to_string(),
            label: "Sustainability anomaly".to_string(),
            subject: filename.into(),
            critical: false,
        }
    }

    /// Context for the synthetic critical-waste demo.
    pub fn for_demo(filename: impl Into<String>) -> Self {
        Self {
            action: "demo_critical_analysis".to_string(),
            source: "agentic_demo_generation".to_string(),
            label: "Synthetic critical waste analysis".to_string(),
            subject: filename.into(),
            critical: false,
        }
    }

    /// Context for the synthetic crisis demo.
    pub fn for_crisis(filename: impl Into<String>) -> Self {
        Self {
            action: "critical_alert".to_string(),
            source: "crisis_demo_generation".to_string(),
            label: "CRITICAL".to_string(),
            subject: filename.into(),
            critical: true,
        }
    }
}

/// JSON body POSTed to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub action: String,
    pub details: String,
    pub severity: Severity,
    pub timestamp: String,
    pub source: String,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
}

impl NotificationPayload {
    /// Build the payload for `finding` at `now`.
    pub fn build(finding: &Finding, context: &NotifyContext, now: DateTime<Utc>) -> Self {
        let details = format!(
            "{}: {} - {}",
            context.label,
            context.subject,
            finding.issues().join("; ")
        );

        Self {
            action: context.action.clone(),
            details,
            severity: if context.critical {
                Severity::High
            } else {
                finding.severity()
            },
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            source: context.source.clone(),
            issues: finding.issues().to_vec(),
            recommendations: finding.recommendations().to_vec(),
            priority: context.critical.then(|| "critical".to_string()),
            critical: context.critical.then_some(true),
        }
    }
}
