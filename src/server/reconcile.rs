//! Signed reconciliation trigger.
//!
//! The duplicate reconciler is a batch repair tool, not a hot path; this
//! endpoint lets an operator (or the producer's dashboard) trigger a sweep
//! remotely. Dry run is the default so a preview costs nothing.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::AppState;
use super::callback::{CallbackError, extract_signature_headers};
use crate::import::ImportError;
use crate::reconcile::{CleanupReport, cleanup};
use crate::signature::verify_callback;

/// Options for a reconciliation sweep. An empty body means dry run.
#[derive(Debug, Deserialize)]
pub struct ReconcileOptions {
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

/// Reconcile handler: `POST /reconcile`, signed like every other endpoint.
///
/// Body: `{"dry_run": bool}`, optional (absent body or field means dry run).
/// Response: the [`CleanupReport`] as JSON.
pub async fn reconcile_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CleanupReport>, CallbackError> {
    let signature_headers = extract_signature_headers(&headers);
    let secret = app_state.config().callback_secret();
    verify_callback(
        &signature_headers,
        &body,
        secret.as_deref(),
        Utc::now().timestamp(),
    )?;

    let options: ReconcileOptions = if body.is_empty() {
        ReconcileOptions { dry_run: true }
    } else {
        serde_json::from_slice(&body)?
    };

    let report = cleanup(app_state.store(), options.dry_run)
        .map_err(|e| ImportError::Failed(e.to_string()))?;

    info!(
        dry_run = report.dry_run,
        total_keys = report.total_keys,
        trashed = report.trashed,
        "reconciliation sweep finished"
    );

    Ok(Json(report))
}
