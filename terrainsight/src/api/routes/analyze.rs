//! Document analysis routes.

use axum::{Json, Router, extract::State, routing::post};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::analysis::{
    DocumentMetadata, FileType, Finding, detect, estimate_energy, generate_summary,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{AnalysisReport, AnalyzeRequest, AnalyzeResponse, WebhookOptions};
use crate::api::server::AppState;
use crate::notification::{DestinationConfig, EnvironmentMode, NotifyContext, resolve};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(analyze))
}

/// Analyse every document and notify for each detected finding.
///
/// Documents are processed concurrently; each gets its own cancellation
/// token derived from the server's shutdown token.
async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    if request.documents.is_empty() {
        return Err(ApiError::bad_request("No documents provided"));
    }
    if let Some(index) = request
        .documents
        .iter()
        .position(|doc| doc.filename.trim().is_empty())
    {
        return Err(ApiError::validation("Document filename must not be empty")
            .with_details(serde_json::json!({ "index": index })));
    }

    let destination = resolve_destination(&state, &request.webhook)?;
    let allow_trigger = request.webhook.allow_trigger;

    let analyses = request.documents.iter().map(|doc| {
        let mut metadata = doc.metadata.clone();
        if metadata.file_size == 0 {
            metadata.file_size = doc.text.len() as u64;
        }
        let finding = detect(&doc.text, &metadata);
        let context = NotifyContext::for_upload(doc.filename.as_str());
        let cancel = state.shutdown.child_token();
        let (state, destination) = (&state, &destination);

        async move {
            build_report(
                state,
                &metadata,
                finding,
                destination,
                allow_trigger,
                context,
                cancel,
            )
            .await
        }
    });

    let results = join_all(analyses).await;

    Ok(Json(AnalyzeResponse {
        success: true,
        results,
    }))
}

/// Resolve the destination for a request.
///
/// A production request that is allowed to trigger fails outright when the
/// server's production destination is missing or invalid.
pub(crate) fn resolve_destination(
    state: &AppState,
    options: &WebhookOptions,
) -> ApiResult<DestinationConfig> {
    let mode = options.mode();
    let destination = resolve(
        &state.settings.webhooks,
        mode,
        options.webhook_test_url.as_deref(),
    );

    if options.allow_trigger && mode == EnvironmentMode::Production {
        destination.ensure_usable()?;
    }

    Ok(destination)
}

/// Summarise a finding and run it through the notifier.
pub(crate) async fn build_report(
    state: &AppState,
    metadata: &DocumentMetadata,
    finding: Finding,
    destination: &DestinationConfig,
    allow_trigger: bool,
    context: NotifyContext,
    cancel: CancellationToken,
) -> AnalysisReport {
    let file_type = FileType::from_filename(&context.subject);
    let summary = generate_summary(file_type, metadata, &finding);
    let energy_estimate = estimate_energy(metadata.file_size, finding.detected());

    let result = state
        .notifier
        .maybe_notify_with_cancel(&finding, destination, allow_trigger, &context, cancel)
        .await;

    info!(
        filename = %context.subject,
        detected = finding.detected(),
        severity = %finding.severity(),
        webhook_state = ?result.state,
        "Document analysed"
    );

    AnalysisReport {
        filename: context.subject,
        file_type,
        webhook_triggered: result.is_delivered(),
        webhook: result.into(),
        finding,
        summary,
        energy_estimate,
    }
}
