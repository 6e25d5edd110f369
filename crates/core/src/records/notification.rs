use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, SyncError};
use crate::sync::SyncStatus;

use super::impl_syncable_record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewComment,
    NewFollower,
    PromptReminder,
    System,
}

/// In-app notification delivered to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub body: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub sync_status: SyncStatus,
}

impl Notification {
    pub fn new(user_id: impl Into<String>, kind: NotificationKind, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            kind,
            body: body.into(),
            read: false,
            created_at: now,
            updated_at: now,
            last_synced_at: None,
            sync_status: SyncStatus::PendingUpload,
        }
    }

    fn validate_fields(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(SyncError::validation("notification requires a user id"));
        }
        if self.body.trim().is_empty() {
            return Err(SyncError::validation("notification body must not be empty"));
        }
        Ok(())
    }
}

impl_syncable_record!(Notification, "notifications");
