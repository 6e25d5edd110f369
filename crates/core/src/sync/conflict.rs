//! Conflict detection and last-writer-wins merge policy.

use chrono::{DateTime, Utc};

use super::record::{SyncStatus, SyncableRecord};

/// Determines whether a remote copy was touched after the local copy last
/// knew the remote state. A record that was never synced treats everything
/// as stale.
pub fn is_stale(last_synced_at: Option<DateTime<Utc>>, remote_updated_at: DateTime<Utc>) -> bool {
    remote_updated_at > last_synced_at.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Record-granularity last-writer-wins merge.
///
/// Rule:
/// 1. the side with the newer `updated_at` keeps every mutable field, wholesale
/// 2. identity never changes
/// 3. the merge is itself a synchronization point: both `updated_at` and
///    `last_synced_at` are stamped to the merge time and the result is synced
///
/// A losing writer's concurrent edits to non-conflicting fields are discarded.
/// Known limitation of record-granularity LWW; field-level merging would need
/// per-field versions.
pub fn merge_lww<T: SyncableRecord>(local: &T, remote: &T, now: DateTime<Utc>) -> T {
    let mut merged = local.clone();
    if remote.updated_at() > local.updated_at() {
        merged.assign_fields_from(remote);
    }
    merged.set_updated_at(now);
    merged.set_last_synced_at(Some(now));
    merged.set_sync_status(SyncStatus::Synced);
    merged
}
