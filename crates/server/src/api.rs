//! HTTP handlers and the ingestion response envelope.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use pricevault_ingest::{FailureKind, IngestionReport, JobOutcome, JobStage, OverallStatus};

use crate::state::AppState;

// ── Health ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Ingestion ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct SuccessBody {
    status: &'static str,
    records_inserted: IndexMap<String, u64>,
    message: &'static str,
}

#[derive(Serialize)]
struct PartialFailureBody<'a> {
    status: &'static str,
    error: &'static str,
    records_inserted: IndexMap<String, u64>,
    failures: IndexMap<&'a str, FailureDetail<'a>>,
    run_id: Uuid,
}

#[derive(Serialize)]
struct FailureDetail<'a> {
    kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<JobStage>,
    message: &'a str,
}

/// `GET /api/fetch_stock_data`: ingest the configured symbols once.
pub async fn fetch_stock_data(State(state): State<Arc<AppState>>) -> Response {
    let report = state.coordinator.run(&state.symbols).await;
    render_report(&report)
}

/// Map a report onto its HTTP status and body.
pub fn render_report(report: &IngestionReport) -> Response {
    match report.overall_status {
        OverallStatus::AllSucceeded => {
            info!(run_id = %report.run_id, records = report.total_records(), "ingestion succeeded");
            let body = SuccessBody {
                status: "success",
                records_inserted: report.records_inserted(),
                message: "Data inserted successfully!",
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        OverallStatus::PartialFailure => {
            let failures: IndexMap<&str, FailureDetail<'_>> = report
                .failures()
                .filter_map(|result| match &result.outcome {
                    JobOutcome::Failure {
                        kind,
                        stage,
                        message,
                    } => Some((
                        result.symbol.as_str(),
                        FailureDetail {
                            kind: *kind,
                            stage: *stage,
                            message: message.as_str(),
                        },
                    )),
                    JobOutcome::Success { .. } => None,
                })
                .collect();
            warn!(
                run_id = %report.run_id,
                failed = failures.len(),
                retryable = ?report.retryable_symbols(),
                "ingestion finished with failures"
            );
            let body = PartialFailureBody {
                status: "partial_failure",
                error: "Some symbols failed to ingest",
                records_inserted: report.records_inserted(),
                failures,
                run_id: report.run_id,
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
        OverallStatus::ConfigurationError => {
            // Setting names stay in the log; the client only learns the run was refused.
            error!(
                run_id = %report.run_id,
                problems = ?report.configuration_problems,
                "ingestion refused"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Environment variables not properly configured" })),
            )
                .into_response()
        }
    }
}

// ── Fallback ──────────────────────────────────────────────────────

pub async fn invalid_endpoint() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Invalid endpoint" })))
}
