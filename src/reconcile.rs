//! Out-of-band duplicate reconciliation.
//!
//! Under correct operation the import coordinator guarantees at most one
//! live content item per canonical key. Races that outlive the lock TTL,
//! or plain historical bugs, can still leave duplicates behind; this module
//! is the explicit repair tool that collapses them. It is a discrete batch
//! sweep, not a hot path, and it does not coordinate with live imports;
//! stale duplicates are eventually visible to the next run.
//!
//! Policy: within a duplicate group the most recently modified item is
//! kept and the rest are trashed (soft-deleted). Recency is a heuristic,
//! not a completeness guarantee.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::{ContentStore, StoreError};
use crate::types::{CanonicalKey, ContentId};

/// Groups live content by canonical key and returns only the collisions.
///
/// Each group's content IDs are ordered by last-modified descending (ties
/// broken by higher ID first, so the ordering is deterministic). Keys are
/// read from the primary canonical-key field, falling back to the legacy
/// field; items with neither are skipped.
pub fn find_duplicates(
    store: &dyn ContentStore,
) -> Result<BTreeMap<CanonicalKey, Vec<ContentId>>, StoreError> {
    let mut groups: BTreeMap<CanonicalKey, Vec<(chrono::DateTime<chrono::Utc>, ContentId)>> =
        BTreeMap::new();

    for record in store.live_items()? {
        let Some(key) = record.effective_key() else {
            warn!(content_id = %record.id, "live item with no canonical key, skipping");
            continue;
        };
        groups
            .entry(key.clone())
            .or_default()
            .push((record.last_modified, record.id));
    }

    let mut duplicates = BTreeMap::new();
    for (key, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| b.cmp(a));
        duplicates.insert(key, members.into_iter().map(|(_, id)| id).collect());
    }
    Ok(duplicates)
}

/// What cleanup decided (or would decide) for one duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupDetail {
    pub canonical_key: CanonicalKey,
    /// The member kept: most recently modified.
    pub kept: ContentId,
    /// The members trashed, newest first.
    pub trashed: Vec<ContentId>,
}

/// Summary of one reconciliation sweep.
///
/// `total_duplicates` counts every member of every duplicate group;
/// `kept + trashed == total_duplicates`. In a dry run the counts describe
/// the plan and nothing was mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    /// Number of canonical keys with more than one live item.
    pub total_keys: usize,
    pub total_duplicates: usize,
    pub trashed: usize,
    pub kept: usize,
    pub details: Vec<CleanupDetail>,
}

/// Collapses every duplicate group down to its most recently modified member.
///
/// With `dry_run` the identical plan is computed and reported but the store
/// is never mutated. A trash failure on one member is surfaced immediately;
/// members already trashed stay trashed (the sweep is safe to rerun).
pub fn cleanup(store: &dyn ContentStore, dry_run: bool) -> Result<CleanupReport, StoreError> {
    let duplicates = find_duplicates(store)?;

    let mut report = CleanupReport {
        dry_run,
        total_keys: duplicates.len(),
        total_duplicates: 0,
        trashed: 0,
        kept: 0,
        details: Vec::with_capacity(duplicates.len()),
    };

    for (canonical_key, members) in duplicates {
        report.total_duplicates += members.len();

        // Ordered newest-first by find_duplicates; the head survives.
        let kept = members[0];
        let losers = &members[1..];

        if !dry_run {
            for id in losers {
                store.trash(*id)?;
            }
        }

        info!(
            canonical_key = %canonical_key,
            kept = %kept,
            trashed = losers.len(),
            dry_run,
            "reconciled duplicate group"
        );

        report.kept += 1;
        report.trashed += losers.len();
        report.details.push(CleanupDetail {
            canonical_key,
            kept,
            trashed: losers.to_vec(),
        });
    }

    Ok(report)
}
