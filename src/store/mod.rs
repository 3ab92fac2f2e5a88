//! Content store collaborator.
//!
//! The ingest pipeline treats storage as a generic key-addressable content
//! store behind the [`ContentStore`] trait: look up by canonical key, create,
//! soft-delete, and enumerate live items for reconciliation. The reference
//! [`MemoryStore`] backs tests and the bundled binary; production deployments
//! plug in their own backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CanonicalKey, ContentId};

pub mod memory;

pub use memory::MemoryStore;

/// Errors surfaced by a content store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No content item with this ID exists.
    #[error("content item not found: {0}")]
    NotFound(ContentId),

    /// Backend-specific failure (connection loss, quota, corruption).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A new content item to be created from an import payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContent {
    /// The canonical key the item will be addressable by.
    pub canonical_key: CanonicalKey,
    /// The opaque generated-page payload.
    pub payload: serde_json::Value,
}

/// A stored content item as seen by the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: ContentId,
    /// The primary canonical-key field.
    pub canonical_key: Option<CanonicalKey>,
    /// A legacy key field still present on historical items. The reconciler
    /// reads it only when the primary field is unset.
    pub legacy_key: Option<CanonicalKey>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub trashed: bool,
}

impl ContentRecord {
    /// The canonical key this record is addressed by, preferring the
    /// primary field over the legacy one.
    pub fn effective_key(&self) -> Option<&CanonicalKey> {
        self.canonical_key.as_ref().or(self.legacy_key.as_ref())
    }
}

/// A generic key-addressable content store.
///
/// Implementations must be safe to share across request handlers.
pub trait ContentStore: Send + Sync {
    /// Finds the live (non-trashed) content item for a canonical key.
    ///
    /// Checks the primary key field first, then the legacy field.
    fn find_by_canonical_key(&self, key: &CanonicalKey) -> Result<Option<ContentId>, StoreError>;

    /// Creates a new content item, returning its ID.
    fn create(&self, content: NewContent) -> Result<ContentId, StoreError>;

    /// Soft-deletes a content item. The item stops being live but is not
    /// physically erased.
    fn trash(&self, id: ContentId) -> Result<(), StoreError>;

    /// Returns the last-modified timestamp of a content item.
    fn last_modified(&self, id: ContentId) -> Result<DateTime<Utc>, StoreError>;

    /// Enumerates all live content items. Used by the duplicate reconciler.
    fn live_items(&self) -> Result<Vec<ContentRecord>, StoreError>;
}
