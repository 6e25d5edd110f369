use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SyncError};
use crate::sync::SyncStatus;

use super::impl_syncable_record;

/// Per-user preferences. `id` is the owning user's id, one row per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub id: String,
    #[serde(default)]
    pub reminders_enabled: bool,
    /// Local hour of day for the journaling reminder, 0..=23.
    #[serde(default)]
    pub reminder_hour: u8,
    pub timezone: String,
    #[serde(default)]
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub sync_status: SyncStatus,
}

impl UserSettings {
    pub fn new(user_id: impl Into<String>, timezone: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: user_id.into(),
            reminders_enabled: false,
            reminder_hour: 21,
            timezone: timezone.into(),
            push_token: None,
            created_at: now,
            updated_at: now,
            last_synced_at: None,
            sync_status: SyncStatus::PendingUpload,
        }
    }

    fn validate_fields(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SyncError::validation("settings require a user id"));
        }
        if self.reminder_hour > 23 {
            return Err(SyncError::validation("reminder hour must be 0..=23"));
        }
        if self.timezone.trim().is_empty() {
            return Err(SyncError::validation("timezone must not be empty"));
        }
        Ok(())
    }
}

impl_syncable_record!(UserSettings, "user_settings");
