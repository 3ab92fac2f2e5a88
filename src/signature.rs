//! Callback signature verification using HMAC-SHA256.
//!
//! The remote producer signs every callback with a shared secret. Four
//! headers carry the proof: a unix timestamp, the SHA-256 of the raw body,
//! an HMAC-SHA256 signature over `"{timestamp}.{body_sha256}"`, and a
//! signature-scheme version. Verification is the first step in callback
//! processing; invalid requests are rejected before any parsing or I/O.
//!
//! All hash and signature comparisons are constant-time.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the unix-seconds timestamp the request was signed at.
pub const HEADER_TIMESTAMP: &str = "x-seogen-timestamp";
/// Header carrying the hex SHA-256 of the raw request body.
pub const HEADER_BODY_SHA256: &str = "x-seogen-body-sha256";
/// Header carrying the hex HMAC-SHA256 signature.
pub const HEADER_SIGNATURE: &str = "x-seogen-signature";
/// Header carrying the signature scheme version.
pub const HEADER_SIGNATURE_VERSION: &str = "x-seogen-signature-version";

/// The single supported signature scheme version.
pub const SIGNATURE_VERSION: &str = "1";

/// Maximum allowed clock skew between signer and receiver, in seconds.
///
/// The window is symmetric: a timestamp 300 seconds in the future is as
/// acceptable as one 300 seconds in the past. Beyond it, a captured request
/// is no longer replayable.
pub const FRESHNESS_WINDOW_SECS: i64 = 300;

/// Why a callback failed verification.
///
/// Each variant maps to a machine-readable wire code via [`VerifyRejection::code`].
/// The checks run in a fixed order; the first failure wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyRejection {
    /// One or more of the timestamp, body-hash, or signature headers is absent.
    #[error("missing signature headers")]
    MissingSignature,

    /// The signature version header is present but not the supported version.
    #[error("unsupported signature version")]
    InvalidSignatureVersion,

    /// The timestamp is outside the freshness window (or unparseable, in
    /// which case freshness cannot be established).
    #[error("timestamp outside freshness window")]
    TimestampExpired,

    /// No shared secret is configured on this receiver. Fail closed.
    #[error("no callback secret configured")]
    NoCallbackSecret,

    /// The SHA-256 of the received body does not match the header value.
    #[error("body hash mismatch")]
    BodyHashMismatch,

    /// The HMAC signature does not match.
    #[error("invalid signature")]
    SignatureInvalid,
}

impl VerifyRejection {
    /// The machine-readable wire code for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            VerifyRejection::MissingSignature => "missing_signature",
            VerifyRejection::InvalidSignatureVersion => "invalid_signature_version",
            VerifyRejection::TimestampExpired => "timestamp_expired",
            VerifyRejection::NoCallbackSecret => "no_callback_secret",
            VerifyRejection::BodyHashMismatch => "body_hash_mismatch",
            VerifyRejection::SignatureInvalid => "signature_invalid",
        }
    }
}

/// The signature headers of an inbound callback, as extracted by the HTTP layer.
///
/// `None` means the header was absent (or not valid UTF-8, which is
/// equivalent for verification purposes).
#[derive(Debug, Clone, Default)]
pub struct CallbackHeaders {
    pub timestamp: Option<String>,
    pub body_sha256: Option<String>,
    pub signature: Option<String>,
    pub signature_version: Option<String>,
}

/// Computes the hex SHA-256 of a request body.
pub fn compute_body_sha256(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Computes the hex HMAC-SHA256 signature for a timestamp and body hash.
///
/// The signed message is `"{timestamp}.{body_sha256}"`. This is what the
/// producer computes when sending; it is also useful for tests.
pub fn compute_signature(secret: &str, timestamp: &str, body_sha256: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body_sha256.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies an inbound callback against the shared secret.
///
/// Runs the checks in order (presence, version, freshness, body hash,
/// signature) and returns the first rejection, or `Ok(())` when all pass.
/// `now_unix` is injected so freshness boundaries are testable.
///
/// Never panics on malformed input; undecodable hex in the hash or
/// signature headers rejects like any other mismatch.
pub fn verify_callback(
    headers: &CallbackHeaders,
    body: &[u8],
    secret: Option<&str>,
    now_unix: i64,
) -> Result<(), VerifyRejection> {
    let (timestamp, body_sha256, signature) = match (
        headers.timestamp.as_deref(),
        headers.body_sha256.as_deref(),
        headers.signature.as_deref(),
    ) {
        (Some(t), Some(h), Some(s)) => (t, h, s),
        _ => return Err(VerifyRejection::MissingSignature),
    };

    if headers.signature_version.as_deref() != Some(SIGNATURE_VERSION) {
        return Err(VerifyRejection::InvalidSignatureVersion);
    }

    // An unparseable timestamp cannot establish freshness, so it rejects
    // the same way a stale one does.
    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| VerifyRejection::TimestampExpired)?;
    if (now_unix - signed_at).abs() > FRESHNESS_WINDOW_SECS {
        return Err(VerifyRejection::TimestampExpired);
    }

    let secret = match secret {
        Some(s) if !s.is_empty() => s,
        _ => return Err(VerifyRejection::NoCallbackSecret),
    };

    // Body hash: recompute and compare as raw digest bytes, constant time.
    let actual_hash = Sha256::digest(body);
    let claimed_hash = hex::decode(body_sha256).map_err(|_| VerifyRejection::BodyHashMismatch)?;
    if !bool::from(actual_hash.as_slice().ct_eq(&claimed_hash)) {
        return Err(VerifyRejection::BodyHashMismatch);
    }

    // Signature: HMAC over the timestamp and the (now verified) body hash.
    // The hmac crate's verify_slice is constant-time.
    let claimed_sig = hex::decode(signature).map_err(|_| VerifyRejection::SignatureInvalid)?;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body_sha256.as_bytes());
    mac.verify_slice(&claimed_sig)
        .map_err(|_| VerifyRejection::SignatureInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "0123456789abcdefghijklmnopqrstuv";
    const NOW: i64 = 1_700_000_000;

    /// Builds a fully valid header set for a body signed at `signed_at`.
    fn signed_headers(body: &[u8], secret: &str, signed_at: i64) -> CallbackHeaders {
        let timestamp = signed_at.to_string();
        let body_sha256 = compute_body_sha256(body);
        let signature = compute_signature(secret, &timestamp, &body_sha256);
        CallbackHeaders {
            timestamp: Some(timestamp),
            body_sha256: Some(body_sha256),
            signature: Some(signature),
            signature_version: Some(SIGNATURE_VERSION.to_string()),
        }
    }

    // ─── Unit tests for each check, in order ───

    #[test]
    fn valid_request_accepted() {
        let body = br#"{"license_key":"abc"}"#;
        let headers = signed_headers(body, SECRET, NOW);
        assert_eq!(verify_callback(&headers, body, Some(SECRET), NOW), Ok(()));
    }

    #[test]
    fn missing_any_header_rejected() {
        let body = b"payload";
        let valid = signed_headers(body, SECRET, NOW);

        for strip in 0..3 {
            let mut headers = valid.clone();
            match strip {
                0 => headers.timestamp = None,
                1 => headers.body_sha256 = None,
                _ => headers.signature = None,
            }
            assert_eq!(
                verify_callback(&headers, body, Some(SECRET), NOW),
                Err(VerifyRejection::MissingSignature)
            );
        }
    }

    #[test]
    fn missing_version_header_rejected() {
        let body = b"payload";
        let mut headers = signed_headers(body, SECRET, NOW);
        headers.signature_version = None;
        assert_eq!(
            verify_callback(&headers, body, Some(SECRET), NOW),
            Err(VerifyRejection::InvalidSignatureVersion)
        );
    }

    #[test]
    fn wrong_version_rejected() {
        let body = b"payload";
        let mut headers = signed_headers(body, SECRET, NOW);
        headers.signature_version = Some("2".to_string());
        assert_eq!(
            verify_callback(&headers, body, Some(SECRET), NOW),
            Err(VerifyRejection::InvalidSignatureVersion)
        );
    }

    #[test]
    fn freshness_boundary_is_inclusive() {
        let body = b"payload";

        // Exactly 300s old: accepted.
        let headers = signed_headers(body, SECRET, NOW - FRESHNESS_WINDOW_SECS);
        assert_eq!(verify_callback(&headers, body, Some(SECRET), NOW), Ok(()));

        // 301s old: rejected.
        let headers = signed_headers(body, SECRET, NOW - FRESHNESS_WINDOW_SECS - 1);
        assert_eq!(
            verify_callback(&headers, body, Some(SECRET), NOW),
            Err(VerifyRejection::TimestampExpired)
        );

        // The window is symmetric: a future timestamp is held to the same bound.
        let headers = signed_headers(body, SECRET, NOW + FRESHNESS_WINDOW_SECS);
        assert_eq!(verify_callback(&headers, body, Some(SECRET), NOW), Ok(()));

        let headers = signed_headers(body, SECRET, NOW + FRESHNESS_WINDOW_SECS + 1);
        assert_eq!(
            verify_callback(&headers, body, Some(SECRET), NOW),
            Err(VerifyRejection::TimestampExpired)
        );
    }

    #[test]
    fn unparseable_timestamp_rejected_as_expired() {
        let body = b"payload";
        let mut headers = signed_headers(body, SECRET, NOW);
        headers.timestamp = Some("not-a-number".to_string());
        assert_eq!(
            verify_callback(&headers, body, Some(SECRET), NOW),
            Err(VerifyRejection::TimestampExpired)
        );
    }

    #[test]
    fn absent_secret_fails_closed() {
        let body = b"payload";
        let headers = signed_headers(body, SECRET, NOW);
        assert_eq!(
            verify_callback(&headers, body, None, NOW),
            Err(VerifyRejection::NoCallbackSecret)
        );
        assert_eq!(
            verify_callback(&headers, body, Some(""), NOW),
            Err(VerifyRejection::NoCallbackSecret)
        );
    }

    #[test]
    fn tampered_body_rejected_as_hash_mismatch() {
        let body = b"original body";
        let headers = signed_headers(body, SECRET, NOW);
        assert_eq!(
            verify_callback(&headers, b"tampered body", Some(SECRET), NOW),
            Err(VerifyRejection::BodyHashMismatch)
        );
    }

    #[test]
    fn undecodable_body_hash_rejected() {
        let body = b"payload";
        let mut headers = signed_headers(body, SECRET, NOW);
        headers.body_sha256 = Some("zzzz".to_string());
        assert_eq!(
            verify_callback(&headers, body, Some(SECRET), NOW),
            Err(VerifyRejection::BodyHashMismatch)
        );
    }

    #[test]
    fn wrong_secret_rejected_as_invalid_signature() {
        let body = b"payload";
        let headers = signed_headers(body, "wrong-secret", NOW);
        assert_eq!(
            verify_callback(&headers, body, Some(SECRET), NOW),
            Err(VerifyRejection::SignatureInvalid)
        );
    }

    #[test]
    fn undecodable_signature_rejected() {
        let body = b"payload";
        let mut headers = signed_headers(body, SECRET, NOW);
        headers.signature = Some("not hex".to_string());
        assert_eq!(
            verify_callback(&headers, body, Some(SECRET), NOW),
            Err(VerifyRejection::SignatureInvalid)
        );
    }

    #[test]
    fn rejection_codes_are_stable() {
        assert_eq!(VerifyRejection::MissingSignature.code(), "missing_signature");
        assert_eq!(
            VerifyRejection::InvalidSignatureVersion.code(),
            "invalid_signature_version"
        );
        assert_eq!(VerifyRejection::TimestampExpired.code(), "timestamp_expired");
        assert_eq!(VerifyRejection::NoCallbackSecret.code(), "no_callback_secret");
        assert_eq!(VerifyRejection::BodyHashMismatch.code(), "body_hash_mismatch");
        assert_eq!(VerifyRejection::SignatureInvalid.code(), "signature_invalid");
    }

    // ─── Property-based tests ───

    proptest! {
        /// Signing and verifying with the same secret always succeeds.
        #[test]
        fn prop_sign_verify_roundtrip(body: Vec<u8>, secret in "[!-~]{1,64}") {
            let headers = signed_headers(&body, &secret, NOW);
            prop_assert_eq!(verify_callback(&headers, &body, Some(&secret), NOW), Ok(()));
        }

        /// Any modification to the body flips the result to reject.
        #[test]
        fn prop_modified_body_rejected(original: Vec<u8>, modified: Vec<u8>) {
            prop_assume!(original != modified);
            let headers = signed_headers(&original, SECRET, NOW);
            prop_assert_ne!(
                verify_callback(&headers, &modified, Some(SECRET), NOW),
                Ok(())
            );
        }

        /// Flipping a single byte of the signature flips the result to reject.
        #[test]
        fn prop_flipped_signature_byte_rejected(body: Vec<u8>, flip_at in 0usize..64) {
            let mut headers = signed_headers(&body, SECRET, NOW);
            let mut sig = headers.signature.take().unwrap().into_bytes();
            // Hex alphabet: flipping to a different hex digit keeps the string
            // decodable while changing the decoded value.
            sig[flip_at] = if sig[flip_at] == b'0' { b'1' } else { b'0' };
            headers.signature = Some(String::from_utf8(sig).unwrap());

            prop_assert_eq!(
                verify_callback(&headers, &body, Some(SECRET), NOW),
                Err(VerifyRejection::SignatureInvalid)
            );
        }

        /// Changing the timestamp after signing rejects (signature covers it).
        #[test]
        fn prop_altered_timestamp_rejected(body: Vec<u8>, delta in 1i64..FRESHNESS_WINDOW_SECS) {
            let mut headers = signed_headers(&body, SECRET, NOW);
            // Still within the freshness window, so only the signature check
            // can catch the alteration.
            headers.timestamp = Some((NOW - delta).to_string());
            prop_assert_eq!(
                verify_callback(&headers, &body, Some(SECRET), NOW),
                Err(VerifyRejection::SignatureInvalid)
            );
        }

        /// Verifying with a different secret always rejects.
        #[test]
        fn prop_wrong_secret_rejected(
            body: Vec<u8>,
            secret1 in "[!-~]{1,64}",
            secret2 in "[!-~]{1,64}",
        ) {
            prop_assume!(secret1 != secret2);
            let headers = signed_headers(&body, &secret1, NOW);
            prop_assert_eq!(
                verify_callback(&headers, &body, Some(&secret2), NOW),
                Err(VerifyRejection::SignatureInvalid)
            );
        }

        /// Malformed header content never panics.
        #[test]
        fn prop_malformed_headers_no_panic(
            body: Vec<u8>,
            timestamp in ".{0,20}",
            hash in ".{0,80}",
            sig in ".{0,80}",
            version in ".{0,4}",
        ) {
            let headers = CallbackHeaders {
                timestamp: Some(timestamp),
                body_sha256: Some(hash),
                signature: Some(sig),
                signature_version: Some(version),
            };
            let _ = verify_callback(&headers, &body, Some(SECRET), NOW);
        }

        /// The body hash helper is deterministic and 64 hex chars.
        #[test]
        fn prop_body_hash_shape(body: Vec<u8>) {
            let h1 = compute_body_sha256(&body);
            let h2 = compute_body_sha256(&body);
            prop_assert_eq!(&h1, &h2);
            prop_assert_eq!(h1.len(), 64);
            prop_assert!(h1.bytes().all(|b| b.is_ascii_hexdigit()));
        }
    }
}
