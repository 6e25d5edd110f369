//! Domain record types of the journaling app.
//!
//! Every type here carries the same sync bookkeeping trio (`updated_at`,
//! `last_synced_at`, `sync_status`) next to its domain fields and implements
//! [`crate::sync::SyncableRecord`] through `impl_syncable_record!`. The only
//! per-type surface is the collection name and `validate_fields`.

pub mod comment;
pub mod dream;
pub mod notification;
pub mod prompt;
pub mod report;
pub mod response;
pub mod settings;
pub mod user;

pub use comment::Comment;
pub use dream::DreamEntry;
pub use notification::{Notification, NotificationKind};
pub use prompt::Prompt;
pub use report::{Report, ReportTarget};
pub use response::PromptResponse;
pub use settings::UserSettings;
pub use user::User;

/// Implements the `SyncableRecord` plumbing for a record struct that has the
/// standard `id`/`updated_at`/`last_synced_at`/`sync_status` fields and a
/// `validate_fields` method.
macro_rules! impl_syncable_record {
    ($ty:ty, $collection:literal) => {
        impl $crate::sync::SyncableRecord for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> &str {
                &self.id
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }

            fn set_updated_at(&mut self, at: ::chrono::DateTime<::chrono::Utc>) {
                self.updated_at = at;
            }

            fn last_synced_at(&self) -> Option<::chrono::DateTime<::chrono::Utc>> {
                self.last_synced_at
            }

            fn set_last_synced_at(
                &mut self,
                at: Option<::chrono::DateTime<::chrono::Utc>>,
            ) {
                self.last_synced_at = at;
            }

            fn sync_status(&self) -> $crate::sync::SyncStatus {
                self.sync_status
            }

            fn set_sync_status(&mut self, status: $crate::sync::SyncStatus) {
                self.sync_status = status;
            }

            fn to_remote(&self) -> $crate::sync::Document {
                $crate::sync::record::to_remote_document(self)
            }

            fn from_remote(
                id: &str,
                doc: &$crate::sync::Document,
            ) -> $crate::errors::Result<Self> {
                $crate::sync::record::from_remote_document($collection, id, doc)
            }

            fn validate(&self) -> $crate::errors::Result<()> {
                self.validate_fields()
            }

            fn assign_fields_from(&mut self, other: &Self) {
                *self = Self {
                    id: self.id.clone(),
                    ..other.clone()
                };
            }
        }
    };
}

pub(crate) use impl_syncable_record;

/// Asserts that a record re-reads identically from its own remote document.
#[cfg(test)]
macro_rules! remote_round_trip_test {
    ($ty:ty, $sample:expr) => {
        #[test]
        fn remote_document_round_trips() {
            use $crate::sync::SyncableRecord;
            let record: $ty = $sample;
            let doc = record.to_remote();
            assert_eq!(doc.get("id").and_then(|v| v.as_str()), Some(record.id()));
            let back = <$ty>::from_remote(record.id(), &doc).unwrap();
            assert_eq!(back, record);
        }
    };
}

#[cfg(test)]
pub(crate) use remote_round_trip_test;
