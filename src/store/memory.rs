//! In-memory content store.
//!
//! Reference implementation of [`ContentStore`] used by tests and the
//! bundled binary. IDs are sequential; timestamps come from the system
//! clock unless a record is inserted wholesale via [`MemoryStore::insert_record`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{ContentRecord, ContentStore, NewContent, StoreError};
use crate::types::{CanonicalKey, ContentId};

#[derive(Default)]
struct Inner {
    next_id: u64,
    items: BTreeMap<ContentId, ContentRecord>,
}

/// A process-local content store backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully specified record, e.g. when seeding historical data.
    ///
    /// Takes the ID from the record and bumps the internal counter past it
    /// so later `create` calls do not collide.
    pub fn insert_record(&self, record: ContentRecord) {
        let mut inner = self.inner.lock().expect("store poisoned");
        inner.next_id = inner.next_id.max(record.id.0);
        inner.items.insert(record.id, record);
    }

    /// Returns a snapshot of a single record, trashed or not.
    pub fn get(&self, id: ContentId) -> Option<ContentRecord> {
        let inner = self.inner.lock().expect("store poisoned");
        inner.items.get(&id).cloned()
    }

    /// Overwrites a record's last-modified timestamp. Test and migration aid.
    pub fn set_last_modified(&self, id: ContentId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store poisoned");
        let record = inner.items.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.last_modified = at;
        Ok(())
    }
}

impl ContentStore for MemoryStore {
    fn find_by_canonical_key(&self, key: &CanonicalKey) -> Result<Option<ContentId>, StoreError> {
        let inner = self.inner.lock().expect("store poisoned");

        // Primary field wins over the legacy field when both match somewhere.
        let by_primary = inner
            .items
            .values()
            .find(|r| !r.trashed && r.canonical_key.as_ref() == Some(key));
        if let Some(record) = by_primary {
            return Ok(Some(record.id));
        }

        let by_legacy = inner
            .items
            .values()
            .find(|r| !r.trashed && r.canonical_key.is_none() && r.legacy_key.as_ref() == Some(key));
        Ok(by_legacy.map(|r| r.id))
    }

    fn create(&self, content: NewContent) -> Result<ContentId, StoreError> {
        let mut inner = self.inner.lock().expect("store poisoned");
        inner.next_id += 1;
        let id = ContentId(inner.next_id);
        let now = Utc::now();
        inner.items.insert(
            id,
            ContentRecord {
                id,
                canonical_key: Some(content.canonical_key),
                legacy_key: None,
                payload: content.payload,
                created_at: now,
                last_modified: now,
                trashed: false,
            },
        );
        Ok(id)
    }

    fn trash(&self, id: ContentId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store poisoned");
        let record = inner.items.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.trashed = true;
        record.last_modified = Utc::now();
        Ok(())
    }

    fn last_modified(&self, id: ContentId) -> Result<DateTime<Utc>, StoreError> {
        let inner = self.inner.lock().expect("store poisoned");
        inner
            .items
            .get(&id)
            .map(|r| r.last_modified)
            .ok_or(StoreError::NotFound(id))
    }

    fn live_items(&self) -> Result<Vec<ContentRecord>, StoreError> {
        let inner = self.inner.lock().expect("store poisoned");
        Ok(inner.items.values().filter(|r| !r.trashed).cloned().collect())
    }
}
