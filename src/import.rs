//! Idempotent import coordination.
//!
//! The coordinator is the only path allowed to mutate the content store on
//! behalf of a callback. Per canonical key it guarantees at most one
//! creation, ever, despite at-least-once delivery and concurrent callbacks:
//!
//! 1. Acquire the import lock for the hashed canonical key (fail fast with
//!    contention if held).
//! 2. Look up existing content; if found this is an idempotent replay and
//!    the payload is NOT reapplied.
//! 3. Otherwise create the item from the payload.
//! 4. The lock guard releases on every exit path.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ConfigProvider;
use crate::lock::{DEFAULT_IMPORT_LOCK_TTL, ImportLockManager};
use crate::store::{ContentStore, NewContent};
use crate::types::{CanonicalKey, ContentId, JobId};

/// Metadata accompanying one generated item.
///
/// Only the canonical key is interpreted; everything else rides along
/// untouched (hub, city, template hints, and whatever else the producer
/// attaches).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub canonical_key: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One inbound import callback, as deserialized from the wire.
///
/// Immutable once received; discarded after handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    pub license_key: String,
    pub job_id: JobId,
    pub item_index: u64,
    /// The opaque generated-page payload.
    pub result_json: serde_json::Value,
    pub item_metadata: ItemMetadata,
}

impl ImportRequest {
    /// The canonical key of this request, or `None` if blank or absent.
    pub fn canonical_key(&self) -> Option<CanonicalKey> {
        let key = CanonicalKey::new(self.item_metadata.canonical_key.clone());
        if key.is_blank() { None } else { Some(key) }
    }
}

/// The outcome of a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub content_id: ContentId,
    /// True when the request was an idempotent replay of an item that
    /// already exists; false when this call performed the creation.
    pub already_existed: bool,
}

/// Why an import was refused or failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// The item metadata carries no canonical key. Not retryable as-is.
    #[error("item metadata has no canonical key")]
    MissingCanonicalKey,

    /// The request's license key does not match this receiver's.
    #[error("license key mismatch")]
    LicenseMismatch,

    /// Another request for the same canonical key holds the import lock.
    /// Transient; the caller should retry later.
    #[error("an import for this canonical key is already in progress")]
    InProgress,

    /// The content store failed during lookup or creation. The lock has
    /// been released, so a retry can proceed.
    #[error("import failed: {0}")]
    Failed(String),
}

impl ImportError {
    /// The machine-readable wire code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::MissingCanonicalKey => "missing_canonical_key",
            ImportError::LicenseMismatch => "license_mismatch",
            ImportError::InProgress => "import_in_progress",
            ImportError::Failed(_) => "import_failed",
        }
    }
}

/// Normalizes a license key for comparison: trimmed and case-folded.
pub fn normalize_license(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Derives the lock key for a canonical key.
///
/// Hashing keeps lock keys uniform in shape and length regardless of what
/// business semantics the canonical key encodes.
pub fn lock_key_for(key: &CanonicalKey) -> String {
    hex::encode(Sha256::digest(key.as_str().as_bytes()))
}

/// Coordinates create-or-noop imports against the content store.
pub struct ImportCoordinator {
    store: Arc<dyn ContentStore>,
    config: Arc<dyn ConfigProvider>,
    locks: ImportLockManager,
    lock_ttl: Duration,
}

impl ImportCoordinator {
    pub fn new(
        store: Arc<dyn ContentStore>,
        config: Arc<dyn ConfigProvider>,
        locks: ImportLockManager,
    ) -> Self {
        ImportCoordinator {
            store,
            config,
            locks,
            lock_ttl: DEFAULT_IMPORT_LOCK_TTL,
        }
    }

    /// Overrides the lock TTL. The default exceeds worst-case import time.
    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    /// Imports a generated item exactly once per canonical key.
    ///
    /// Replays of an already-imported key succeed with
    /// `already_existed = true` and do not touch the stored payload.
    pub fn import_or_noop(&self, request: &ImportRequest) -> Result<ImportOutcome, ImportError> {
        let canonical_key = request
            .canonical_key()
            .ok_or(ImportError::MissingCanonicalKey)?;

        self.check_license(&request.license_key)?;

        // Single-owner lock over the lookup-then-create window. Contention
        // is not a correctness problem; the caller retries.
        let _guard = self
            .locks
            .try_acquire(&lock_key_for(&canonical_key), self.lock_ttl)
            .ok_or(ImportError::InProgress)?;

        let existing = self
            .store
            .find_by_canonical_key(&canonical_key)
            .map_err(|e| ImportError::Failed(e.to_string()))?;

        if let Some(content_id) = existing {
            debug!(
                canonical_key = %canonical_key,
                content_id = %content_id,
                job_id = %request.job_id,
                "duplicate import, returning existing content"
            );
            return Ok(ImportOutcome {
                content_id,
                already_existed: true,
            });
        }

        let content_id = self
            .store
            .create(NewContent {
                canonical_key: canonical_key.clone(),
                payload: request.result_json.clone(),
            })
            .map_err(|e| ImportError::Failed(e.to_string()))?;

        info!(
            canonical_key = %canonical_key,
            content_id = %content_id,
            job_id = %request.job_id,
            item_index = request.item_index,
            "imported new content item"
        );

        Ok(ImportOutcome {
            content_id,
            already_existed: false,
        })
        // _guard drops here (and on every early return above it).
    }

    fn check_license(&self, request_license: &str) -> Result<(), ImportError> {
        let configured = self.config.license_key().unwrap_or_default();
        if normalize_license(request_license) == normalize_license(&configured)
            && !configured.trim().is_empty()
        {
            return Ok(());
        }

        // Lengths are enough to diagnose truncation or an empty config
        // without leaking either key.
        warn!(
            request_len = request_license.len(),
            configured_len = configured.len(),
            "license key mismatch"
        );
        Err(ImportError::LicenseMismatch)
    }
}
