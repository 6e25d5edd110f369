use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, SyncError};
use crate::sync::SyncStatus;

use super::impl_syncable_record;

/// What a report points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportTarget {
    Dream,
    Response,
    Comment,
    User,
}

/// Abuse report filed by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub reporter_id: String,
    pub target_kind: ReportTarget,
    pub target_id: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub sync_status: SyncStatus,
}

impl Report {
    pub fn new(
        reporter_id: impl Into<String>,
        target_kind: ReportTarget,
        target_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            reporter_id: reporter_id.into(),
            target_kind,
            target_id: target_id.into(),
            reason: reason.into(),
            created_at: now,
            updated_at: now,
            last_synced_at: None,
            sync_status: SyncStatus::PendingUpload,
        }
    }

    fn validate_fields(&self) -> Result<()> {
        if self.reporter_id.trim().is_empty() || self.target_id.trim().is_empty() {
            return Err(SyncError::validation(
                "report requires a reporter id and a target id",
            ));
        }
        if self.reason.trim().is_empty() {
            return Err(SyncError::validation("report reason must not be empty"));
        }
        Ok(())
    }
}

impl_syncable_record!(Report, "reports");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::remote_round_trip_test;
    use crate::sync::SyncableRecord;

    remote_round_trip_test!(
        Report,
        Report::new("user-1", ReportTarget::Comment, "comment-9", "harassment")
    );

    #[test]
    fn target_kind_uses_snake_case_on_the_wire() {
        let report = Report::new("user-1", ReportTarget::Dream, "dream-3", "spam");
        let doc = report.to_remote();
        assert_eq!(doc.get("targetKind").and_then(|v| v.as_str()), Some("dream"));
    }
}
