//! Short-TTL advisory locks for in-flight imports.
//!
//! One lock per canonical content key guards the lookup-then-create window
//! in the import coordinator. Acquisition is a single atomic set-if-absent
//! against the shared map; there is no separate read-then-write step, so two
//! concurrent callers for the same key cannot both acquire.
//!
//! Locks expire after a TTL so a crashed holder cannot wedge a key forever.
//! The default TTL (60 seconds) exceeds worst-case import handling time.
//! Release happens through the RAII [`ImportLockGuard`] on every exit path,
//! or by expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Default lock TTL. Bounds the blast radius of a crashed holder.
pub const DEFAULT_IMPORT_LOCK_TTL: Duration = Duration::from_secs(60);

/// Process-wide lock table keyed by hashed canonical key.
///
/// Cloning is cheap; clones share the same table.
#[derive(Clone, Default)]
pub struct ImportLockManager {
    // Maps lock key to its expiry instant. Entries at or past expiry are
    // treated as absent by acquire.
    held: Arc<Mutex<HashMap<String, Instant>>>,
}

impl ImportLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to acquire the lock for `key` with the given TTL.
    ///
    /// Returns a guard that releases the lock when dropped, or `None` if the
    /// lock is currently held by someone else. Never blocks or waits: the
    /// caller surfaces contention immediately.
    pub fn try_acquire(&self, key: &str, ttl: Duration) -> Option<ImportLockGuard> {
        let now = Instant::now();
        let mut held = self.held.lock().expect("lock table poisoned");

        // The whole check-and-insert runs under one mutex hold, making
        // acquisition atomic with respect to other callers.
        if let Some(expiry) = held.get(key) {
            if *expiry > now {
                debug!(key, "import lock contended");
                return None;
            }
            warn!(key, "import lock expired without release, reclaiming");
        }

        held.insert(key.to_string(), now + ttl);
        Some(ImportLockGuard {
            manager: self.clone(),
            key: key.to_string(),
        })
    }

    /// Releases the lock for `key` regardless of holder.
    ///
    /// The coordinator only releases through the guard; this exists for
    /// manual intervention and for the guard itself.
    pub fn release(&self, key: &str) {
        let mut held = self.held.lock().expect("lock table poisoned");
        held.remove(key);
    }

    /// Returns true if `key` is currently locked (held and unexpired).
    pub fn is_held(&self, key: &str) -> bool {
        let held = self.held.lock().expect("lock table poisoned");
        held.get(key).is_some_and(|expiry| *expiry > Instant::now())
    }

    /// Drops expired entries. Acquire treats them as absent anyway; this
    /// just keeps the table from growing across many distinct keys.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut held = self.held.lock().expect("lock table poisoned");
        let before = held.len();
        held.retain(|_, expiry| *expiry > now);
        before - held.len()
    }
}

/// Holds an import lock until dropped.
///
/// Dropping releases the lock, covering normal returns, error returns, and
/// unwinding alike.
pub struct ImportLockGuard {
    manager: ImportLockManager,
    key: String,
}

impl ImportLockGuard {
    /// The lock key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ImportLockGuard {
    fn drop(&mut self) {
        self.manager.release(&self.key);
    }
}
