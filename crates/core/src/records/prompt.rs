use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, SyncError};
use crate::sync::SyncStatus;

use super::impl_syncable_record;

const PROMPT_TEXT_MAX_LEN: usize = 280;

/// Daily journaling prompt shown to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: String,
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub sync_status: SyncStatus,
}

impl Prompt {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            category: category.into(),
            active: true,
            scheduled_for: None,
            created_at: now,
            updated_at: now,
            last_synced_at: None,
            sync_status: SyncStatus::PendingUpload,
        }
    }

    fn validate_fields(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(SyncError::validation("prompt text must not be empty"));
        }
        if self.text.chars().count() > PROMPT_TEXT_MAX_LEN {
            return Err(SyncError::validation(format!(
                "prompt text exceeds {PROMPT_TEXT_MAX_LEN} characters"
            )));
        }
        Ok(())
    }
}

impl_syncable_record!(Prompt, "prompts");
