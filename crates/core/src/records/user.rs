use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SyncError};
use crate::sync::SyncStatus;

use super::impl_syncable_record;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
const DISPLAY_NAME_MAX_LEN: usize = 50;
const BIO_MAX_LEN: usize = 500;

/// Public profile of an account. `id` is the auth identity id, never a
/// generated uuid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub sync_status: SyncStatus,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            display_name: None,
            avatar_url: None,
            bio: None,
            profile_complete: false,
            created_at: now,
            updated_at: now,
            last_synced_at: None,
            sync_status: SyncStatus::PendingUpload,
        }
    }

    /// `[a-z0-9_]{3,30}` per the profile rules.
    pub fn is_valid_username(candidate: &str) -> bool {
        (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&candidate.len())
            && candidate
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }

    fn validate_fields(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SyncError::validation("user id must not be empty"));
        }
        if !Self::is_valid_username(&self.username) {
            return Err(SyncError::validation(format!(
                "username '{}' must match [a-z0-9_]{{{},{}}}",
                self.username, USERNAME_MIN_LEN, USERNAME_MAX_LEN
            )));
        }
        if !self.email.contains('@') {
            return Err(SyncError::validation("email must contain '@'"));
        }
        if let Some(name) = &self.display_name {
            if name.chars().count() > DISPLAY_NAME_MAX_LEN {
                return Err(SyncError::validation(format!(
                    "display name exceeds {DISPLAY_NAME_MAX_LEN} characters"
                )));
            }
        }
        if let Some(bio) = &self.bio {
            if bio.chars().count() > BIO_MAX_LEN {
                return Err(SyncError::validation(format!(
                    "bio exceeds {BIO_MAX_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

impl_syncable_record!(User, "users");
