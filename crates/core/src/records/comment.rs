use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, SyncError};
use crate::sync::SyncStatus;

use super::impl_syncable_record;

const COMMENT_MAX_LEN: usize = 1000;

/// Comment left under a prompt response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub response_id: String,
    pub user_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub sync_status: SyncStatus,
}

impl Comment {
    pub fn new(
        response_id: impl Into<String>,
        user_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            response_id: response_id.into(),
            user_id: user_id.into(),
            body: body.into(),
            created_at: now,
            updated_at: now,
            last_synced_at: None,
            sync_status: SyncStatus::PendingUpload,
        }
    }

    fn validate_fields(&self) -> Result<()> {
        if self.response_id.trim().is_empty() || self.user_id.trim().is_empty() {
            return Err(SyncError::validation(
                "comment requires a response id and a user id",
            ));
        }
        if self.body.trim().is_empty() {
            return Err(SyncError::validation("comment body must not be empty"));
        }
        if self.body.chars().count() > COMMENT_MAX_LEN {
            return Err(SyncError::validation(format!(
                "comment exceeds {COMMENT_MAX_LEN} characters"
            )));
        }
        Ok(())
    }
}

impl_syncable_record!(Comment, "comments");
