//! Signed ping endpoint.
//!
//! Lets the producer confirm that this receiver is reachable, that the
//! shared secret matches, and where callbacks should be delivered. The
//! signature scheme is enforced exactly as on the callback endpoint, so a
//! successful ping proves end-to-end credential agreement, not just
//! liveness (that is what `GET /health` is for).

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use super::AppState;
use super::callback::{CallbackError, extract_signature_headers};
use crate::signature::verify_callback;

/// JSON body of a successful ping.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub success: bool,
    /// Public base URL of this receiver.
    pub site_url: String,
    /// Base URL the producer should deliver callbacks to.
    pub rest_base_url: String,
    /// Whether a license key is configured on this receiver.
    pub license_valid: bool,
    /// Receiver clock, unix seconds. Lets the producer detect skew before
    /// it starts failing the freshness window.
    pub timestamp: i64,
}

/// Ping handler. Same header set and freshness window as the callback
/// endpoint; the body may be empty but is still covered by the body hash.
pub async fn ping_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PingResponse>, CallbackError> {
    let signature_headers = extract_signature_headers(&headers);
    let secret = app_state.config().callback_secret();
    let now = Utc::now().timestamp();
    verify_callback(&signature_headers, &body, secret.as_deref(), now)?;

    debug!("verified ping");

    let site_url = app_state.public_url().trim_end_matches('/').to_string();
    let license_valid = app_state
        .config()
        .license_key()
        .is_some_and(|key| !key.trim().is_empty());

    Ok(Json(PingResponse {
        success: true,
        rest_base_url: format!("{site_url}/callback"),
        site_url,
        license_valid,
        timestamp: now,
    }))
}
