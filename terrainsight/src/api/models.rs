//! API request and response models.
//!
//! JSON uses camelCase field names to match the browser client.

use serde::{Deserialize, Serialize};

use crate::analysis::{DocumentMetadata, FileType, Finding};
use crate::notification::{EnvironmentMode, NotifyResult, NotifyState};

// ============================================================================
// Shared
// ============================================================================

/// Webhook options sent with analysis requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOptions {
    /// `test` (default) or `prod`.
    #[serde(default)]
    pub env_mode: Option<String>,
    /// Must be exactly `true` for anything to be sent.
    #[serde(default)]
    pub allow_trigger: bool,
    /// Test endpoint used when the server has none configured.
    #[serde(default, alias = "n8nWebhookTest")]
    pub webhook_test_url: Option<String>,
}

impl WebhookOptions {
    pub fn mode(&self) -> EnvironmentMode {
        EnvironmentMode::parse_lenient(self.env_mode.as_deref())
    }
}

/// Notification state reported to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookStatus {
    pub state: NotifyState,
    /// Whether a request reached the network.
    pub triggered: bool,
    pub env_mode: EnvironmentMode,
    /// HTTP status of the last attempt; 0 when none was received.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub attempts: u8,
}

impl From<NotifyResult> for WebhookStatus {
    fn from(result: NotifyResult) -> Self {
        Self {
            state: result.state,
            triggered: result.triggered(),
            env_mode: result.mode,
            status: result.outcome.final_status_code,
            detail: result.outcome.detail,
            skip_reason: result.skip_reason,
            attempts: result.outcome.attempts,
        }
    }
}

/// Analysis of one document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub filename: String,
    pub file_type: FileType,
    pub finding: Finding,
    pub summary: String,
    /// kWh
    pub energy_estimate: f64,
    /// True only when the endpoint accepted the notification.
    pub webhook_triggered: bool,
    pub webhook: WebhookStatus,
}

// ============================================================================
// Analyze
// ============================================================================

/// One extracted document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub filename: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub documents: Vec<DocumentInput>,
    #[serde(flatten)]
    pub webhook: WebhookOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub results: Vec<AnalysisReport>,
}

// ============================================================================
// Demo
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoRequest {
    #[serde(flatten)]
    pub webhook: WebhookOptions,
    /// Generate the crisis scenario instead of the critical-waste one.
    #[serde(default)]
    pub crisis: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedData {
    pub filename: String,
    pub record_count: usize,
    pub critical_values: usize,
    pub max_consumption: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoResponse {
    pub success: bool,
    pub result: AnalysisReport,
    pub generated_data: GeneratedData,
    pub webhook_status: WebhookStatus,
}

// ============================================================================
// Settings / health
// ============================================================================

/// Which webhook settings the server provides. Never carries URLs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSettingsResponse {
    pub test_url_from_env: bool,
    pub production_configured: bool,
    pub is_production: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}
