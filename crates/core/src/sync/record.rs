//! The generic contract every synchronizable record type implements.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SyncError};

use super::conflict;

/// A remote document body: the `toRemote` map plus engine bookkeeping fields.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Remote document key carrying the engine's status bookkeeping.
pub const REMOTE_SYNC_STATUS_KEY: &str = "syncStatus";
/// Remote document key carrying the engine's last-synced bookkeeping.
pub const REMOTE_LAST_SYNCED_AT_KEY: &str = "lastSyncedAt";

/// Per-record sync lifecycle status. Mutated only by the sync engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    /// A freshly created or locally mutated record waiting for a push.
    #[default]
    PendingUpload,
    /// Locally deleted; removed for good once the remote delete is confirmed.
    PendingDelete,
    /// Push failed permanently; cleared by an explicit retry.
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::PendingUpload => "pending_upload",
            Self::PendingDelete => "pending_delete",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "synced" => Ok(Self::Synced),
            "pending_upload" => Ok(Self::PendingUpload),
            "pending_delete" => Ok(Self::PendingDelete),
            "error" => Ok(Self::Error),
            other => Err(SyncError::store(format!("unknown sync status '{other}'"))),
        }
    }
}

/// Contract between the engine and a concrete record type.
///
/// Application code owns the domain fields and `updated_at`; the engine owns
/// `sync_status` and `last_synced_at` and is the only writer of both.
pub trait SyncableRecord: Clone + Send + Sync + Sized + 'static {
    /// Fixed remote collection name for this type.
    const COLLECTION: &'static str;

    /// Stable identity, unique within the collection, never reassigned.
    fn id(&self) -> &str;

    fn updated_at(&self) -> DateTime<Utc>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// When the local copy last matched the remote copy; `None` = never synced.
    fn last_synced_at(&self) -> Option<DateTime<Utc>>;
    fn set_last_synced_at(&mut self, at: Option<DateTime<Utc>>);

    fn sync_status(&self) -> SyncStatus;
    fn set_sync_status(&mut self, status: SyncStatus);

    /// Domain fields as a remote document body (bookkeeping fields excluded;
    /// the engine appends those on write).
    fn to_remote(&self) -> Document;

    /// Decode a remote document. Missing required fields surface as
    /// [`SyncError::Decode`], never a panic.
    fn from_remote(id: &str, doc: &Document) -> Result<Self>;

    /// Domain invariants; failures surface as [`SyncError::Validation`].
    fn validate(&self) -> Result<()>;

    /// Replace every mutable field with `other`'s value, preserving identity.
    /// Used by the last-writer-wins merge; bookkeeping is restamped afterwards.
    fn assign_fields_from(&mut self, other: &Self);

    /// A conflict exists when `other` was touched after this record last knew
    /// the remote state. Coarse by design: staleness, not field-level diffing.
    fn has_conflict_with(&self, other: &Self) -> bool {
        conflict::is_stale(self.last_synced_at(), other.updated_at())
    }

    /// Record-granularity last-writer-wins merge. The merge itself is a new
    /// synchronization point: both timestamps are stamped to `now` and the
    /// result is `Synced`.
    fn merge_from(&self, other: &Self, now: DateTime<Utc>) -> Self {
        conflict::merge_lww(self, other, now)
    }
}

/// Serialize a record's domain fields into a remote document body.
pub fn to_remote_document<T: Serialize>(record: &T) -> Document {
    match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Document::new(),
    }
}

/// Decode a record from a remote document body, with the document id taking
/// precedence over any `id` field embedded in the body.
pub fn from_remote_document<T: DeserializeOwned>(
    collection: &str,
    id: &str,
    doc: &Document,
) -> Result<T> {
    let mut body = doc.clone();
    body.insert("id".to_string(), serde_json::Value::String(id.to_string()));
    serde_json::from_value(serde_json::Value::Object(body))
        .map_err(|e| SyncError::decode(collection, id, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_status_serialization_matches_store_contract() {
        let actual = [
            SyncStatus::Synced,
            SyncStatus::PendingUpload,
            SyncStatus::PendingDelete,
            SyncStatus::Error,
        ]
        .iter()
        .map(|status| serde_json::to_string(status).expect("serialize sync status"))
        .collect::<Vec<_>>();

        let expected = vec![
            "\"synced\"",
            "\"pending_upload\"",
            "\"pending_delete\"",
            "\"error\"",
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn sync_status_round_trips_through_str() {
        for status in [
            SyncStatus::Synced,
            SyncStatus::PendingUpload,
            SyncStatus::PendingDelete,
            SyncStatus::Error,
        ] {
            let parsed: SyncStatus = status.as_str().parse().expect("parse status");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn document_id_wins_over_embedded_id() {
        let mut doc = Document::new();
        doc.insert(
            "id".to_string(),
            serde_json::Value::String("stale".to_string()),
        );
        doc.insert(
            "name".to_string(),
            serde_json::Value::String("x".to_string()),
        );

        #[derive(serde::Deserialize)]
        struct Probe {
            id: String,
            #[allow(dead_code)]
            name: String,
        }

        let probe: Probe = from_remote_document("probes", "fresh", &doc).expect("decode");
        assert_eq!(probe.id, "fresh");
    }
}
