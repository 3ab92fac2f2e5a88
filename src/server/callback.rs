//! Import callback endpoint handler.
//!
//! Receives generated-page payloads from the remote producer, verifies the
//! request signature before any parsing or side effect, and hands the body
//! to the import coordinator. Responses carry machine-readable codes so the
//! producer can distinguish retryable contention from permanent rejection.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::AppState;
use crate::import::{ImportError, ImportRequest};
use crate::signature::{
    CallbackHeaders, HEADER_BODY_SHA256, HEADER_SIGNATURE, HEADER_SIGNATURE_VERSION,
    HEADER_TIMESTAMP, VerifyRejection, verify_callback,
};

/// Errors that can occur when processing a callback.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// Signature verification rejected the request.
    #[error(transparent)]
    Verify(#[from] VerifyRejection),

    /// The body is not a valid import request.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The import coordinator refused or failed the request.
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl CallbackError {
    /// The machine-readable wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            CallbackError::Verify(rejection) => rejection.code(),
            CallbackError::InvalidJson(_) => "invalid_payload",
            CallbackError::Import(error) => error.code(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            // All verifier rejections are one fail-closed gate: callers are
            // not told whether the receiver lost its secret.
            CallbackError::Verify(_) => StatusCode::UNAUTHORIZED,
            CallbackError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            CallbackError::Import(ImportError::MissingCanonicalKey) => StatusCode::BAD_REQUEST,
            CallbackError::Import(ImportError::LicenseMismatch) => StatusCode::FORBIDDEN,
            CallbackError::Import(ImportError::InProgress) => StatusCode::CONFLICT,
            CallbackError::Import(ImportError::Failed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body returned for every failed callback.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    message: String,
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// JSON body of a successful callback.
#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub success: bool,
    pub post_id: u64,
    pub already_imported: bool,
}

/// Reads the signature headers from an inbound request.
///
/// Absent headers (or ones with non-UTF-8 values) become `None` and are
/// rejected by verification.
pub fn extract_signature_headers(headers: &HeaderMap) -> CallbackHeaders {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };
    CallbackHeaders {
        timestamp: get(HEADER_TIMESTAMP),
        body_sha256: get(HEADER_BODY_SHA256),
        signature: get(HEADER_SIGNATURE),
        signature_version: get(HEADER_SIGNATURE_VERSION),
    }
}

/// Import callback handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers: `X-Seogen-Timestamp`, `X-Seogen-Body-SHA256`,
///   `X-Seogen-Signature`, `X-Seogen-Signature-Version: 1`
/// - Body: JSON `{license_key, job_id, item_index, result_json,
///   item_metadata: {canonical_key, ...}}`
///
/// # Response
///
/// - 200 `{"success": true, "post_id": ..., "already_imported": ...}`
/// - 401 signature, timestamp, or secret problems
/// - 403 license mismatch
/// - 400 missing canonical key or malformed body
/// - 409 an import for the same canonical key is in progress (retry later)
/// - 500 content store failure
pub async fn callback_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CallbackResponse>, CallbackError> {
    // Verify the signature BEFORE any parsing or I/O: malicious requests
    // get no further resources and cause no side effects.
    let signature_headers = extract_signature_headers(&headers);
    let secret = app_state.config().callback_secret();
    verify_callback(
        &signature_headers,
        &body,
        secret.as_deref(),
        Utc::now().timestamp(),
    )
    .inspect_err(|rejection| {
        warn!(code = rejection.code(), "rejected callback");
    })?;

    let request: ImportRequest = serde_json::from_slice(&body)?;
    debug!(
        job_id = %request.job_id,
        item_index = request.item_index,
        "verified import callback"
    );

    let outcome = app_state.coordinator().import_or_noop(&request)?;

    Ok(Json(CallbackResponse {
        success: true,
        post_id: outcome.content_id.0,
        already_imported: outcome.already_existed,
    }))
}
