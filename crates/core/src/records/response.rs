use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, SyncError};
use crate::sync::SyncStatus;

use super::impl_syncable_record;

/// A user's recorded answer to a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResponse {
    pub id: String,
    pub prompt_id: String,
    pub user_id: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub duration_secs: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub sync_status: SyncStatus,
}

impl PromptResponse {
    pub fn new(prompt_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            prompt_id: prompt_id.into(),
            user_id: user_id.into(),
            video_url: None,
            transcript: None,
            duration_secs: 0,
            created_at: now,
            updated_at: now,
            last_synced_at: None,
            sync_status: SyncStatus::PendingUpload,
        }
    }

    fn validate_fields(&self) -> Result<()> {
        if self.prompt_id.trim().is_empty() || self.user_id.trim().is_empty() {
            return Err(SyncError::validation(
                "response requires a prompt id and a user id",
            ));
        }
        if self.video_url.is_some() && self.duration_secs == 0 {
            return Err(SyncError::validation(
                "a recorded response must have a positive duration",
            ));
        }
        Ok(())
    }
}

impl_syncable_record!(PromptResponse, "responses");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::remote_round_trip_test;

    remote_round_trip_test!(PromptResponse, {
        let mut response = PromptResponse::new("prompt-1", "user-1");
        response.video_url = Some("https://cdn.example.com/r1.mp4".into());
        response.transcript = Some("I was back at the old house.".into());
        response.duration_secs = 42;
        response
    });

    #[test]
    fn recorded_response_needs_a_duration() {
        let mut response = PromptResponse::new("prompt-1", "user-1");
        response.video_url = Some("https://cdn.example.com/r1.mp4".into());
        assert!(response.validate_fields().is_err());
        response.duration_secs = 12;
        assert!(response.validate_fields().is_ok());
    }
}
