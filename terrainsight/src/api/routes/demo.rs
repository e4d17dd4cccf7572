//! Synthetic demo routes.

use axum::body::Bytes;
use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use tracing::debug;

use crate::analysis::{ScenarioKind, SyntheticReport, detect};
use crate::api::error::ApiResult;
use crate::api::models::{DemoRequest, DemoResponse, GeneratedData};
use crate::api::routes::analyze::{build_report, resolve_destination};
use crate::api::server::AppState;
use crate::notification::NotifyContext;

pub fn router() -> Router<AppState> {
    Router::new().route("/generate-and-analyze", post(generate_and_analyze))
}

/// Generate a synthetic report, analyse it and notify like an upload would.
///
/// The crisis scenario escalates the finding and sends a critical alert.
/// A missing or unreadable body runs the default scenario with triggers off.
async fn generate_and_analyze(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<DemoResponse>> {
    let request = parse_request(&body);
    let destination = resolve_destination(&state, &request.webhook)?;

    let (kind, context) = if request.crisis {
        (
            ScenarioKind::Crisis,
            NotifyContext::for_crisis(ScenarioKind::Crisis.filename()),
        )
    } else {
        (
            ScenarioKind::Critical,
            NotifyContext::for_demo(ScenarioKind::Critical.filename()),
        )
    };

    let report = SyntheticReport::generate(kind, Utc::now());
    let mut finding = detect(&report.csv, &report.metadata);
    if request.crisis {
        finding = finding.crisis_override();
    }

    let result = build_report(
        &state,
        &report.metadata,
        finding,
        &destination,
        request.webhook.allow_trigger,
        context,
        state.shutdown.child_token(),
    )
    .await;

    Ok(Json(DemoResponse {
        success: true,
        webhook_status: result.webhook.clone(),
        generated_data: GeneratedData {
            filename: report.filename().to_string(),
            record_count: report.rows.len(),
            critical_values: report.critical_values(),
            max_consumption: report.max_consumption(),
        },
        result,
    }))
}

fn parse_request(body: &[u8]) -> DemoRequest {
    if body.iter().all(u8::is_ascii_whitespace) {
        return DemoRequest::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|error| {
        debug!(error = %error, "Ignoring unreadable demo request body");
        DemoRequest::default()
    })
}
