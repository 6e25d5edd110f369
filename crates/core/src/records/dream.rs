use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, SyncError};
use crate::sync::SyncStatus;

use super::impl_syncable_record;

const TITLE_MAX_LEN: usize = 120;
pub const LUCIDITY_MAX: u8 = 5;

/// One journaled dream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamEntry {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub body: String,
    /// Self-reported lucidity, 0 (none) to 5 (fully lucid).
    #[serde(default)]
    pub lucidity: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub sync_status: SyncStatus,
}

impl DreamEntry {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            body: body.into(),
            lucidity: 0,
            tags: Vec::new(),
            recorded_at: now,
            created_at: now,
            updated_at: now,
            last_synced_at: None,
            sync_status: SyncStatus::PendingUpload,
        }
    }

    fn validate_fields(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(SyncError::validation("dream entry requires a user id"));
        }
        if self.title.chars().count() > TITLE_MAX_LEN {
            return Err(SyncError::validation(format!(
                "title exceeds {TITLE_MAX_LEN} characters"
            )));
        }
        if self.lucidity > LUCIDITY_MAX {
            return Err(SyncError::validation(format!(
                "lucidity must be between 0 and {LUCIDITY_MAX}"
            )));
        }
        Ok(())
    }
}

impl_syncable_record!(DreamEntry, "dreams");
