//! Account provisioning on top of the user sync engine.

use std::sync::Arc;

use log::{debug, warn};
use rand::Rng;

use crate::errors::{Result, SyncError};
use crate::records::user::{User, USERNAME_MAX_LEN, USERNAME_MIN_LEN};

use super::engine::SyncEngine;
use super::record::SyncableRecord;
use super::stores::{LocalStore, RemoteStore};

/// Collision probes before falling back to a deterministic name.
pub const MAX_USERNAME_ATTEMPTS: usize = 3;

const SUFFIX_DIGITS: usize = 4;
const FALLBACK_USERNAME: &str = "dreamer";

/// Provisions [`User`] records from auth identities.
///
/// Usernames are derived from the display name or the email local-part and
/// probed against the remote collection for collisions. Probing is bounded;
/// after [`MAX_USERNAME_ATTEMPTS`] random suffixes the name degrades to a
/// deterministic suffix taken from the record id, which cannot collide with
/// another account's derivation of the same base.
pub struct UserSyncService {
    engine: Arc<SyncEngine<User>>,
}

impl UserSyncService {
    pub fn new(engine: Arc<SyncEngine<User>>) -> Self {
        Self { engine }
    }

    /// Create and push the profile record for a fresh auth identity.
    ///
    /// Offline creation still succeeds: the record is queued locally and
    /// returned in `pending_upload` status.
    pub async fn create_from_identity(
        &self,
        id: &str,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<User> {
        let base = derive_username(display_name, email);
        let username = self.claim_username(&base, id).await;

        let mut user = User::new(id, username, email);
        user.display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from);
        user.validate()?;

        let queued = user.clone();
        match self.engine.sync(user).await {
            Ok(synced) => Ok(synced),
            Err(SyncError::Offline) => {
                debug!("[Sync] offline, queued new profile for {id}");
                Ok(queued)
            }
            Err(err) => Err(err),
        }
    }

    /// Flip `profile_complete` on the stored record and push it.
    pub async fn mark_profile_complete(&self, id: &str) -> Result<User> {
        let Some(mut user) = self.engine.local().get(id).await? else {
            return Err(SyncError::not_found(User::COLLECTION, id));
        };
        user.profile_complete = true;
        user.set_updated_at(self.engine.clock().now());
        self.engine.sync(user).await
    }

    /// Probe for a free username. A probe that cannot reach the remote store
    /// accepts the candidate as-is; the push will surface any real conflict.
    async fn claim_username(&self, base: &str, record_id: &str) -> String {
        let mut candidate = base.to_string();
        for attempt in 0..=MAX_USERNAME_ATTEMPTS {
            match self.username_taken(&candidate).await {
                Ok(false) => return candidate,
                Ok(true) => {
                    debug!("[Sync] username '{candidate}' taken (attempt {attempt})");
                    candidate = with_random_suffix(base);
                }
                Err(err) => {
                    warn!("[Sync] username probe failed, keeping '{candidate}': {err}");
                    return candidate;
                }
            }
        }
        fallback_username(base, record_id)
    }

    async fn username_taken(&self, candidate: &str) -> Result<bool> {
        let docs = self.engine.remote().query_collection(User::COLLECTION).await?;
        Ok(docs.iter().any(|(_, doc)| {
            doc.get("username").and_then(|v| v.as_str()) == Some(candidate)
        }))
    }
}

/// Lowercased, filtered to the username alphabet, sized to leave room for a
/// collision suffix.
pub fn derive_username(display_name: Option<&str>, email: &str) -> String {
    let source = display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default());

    let mut base: String = source
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .take(USERNAME_MAX_LEN - SUFFIX_DIGITS)
        .collect();
    if base.len() < USERNAME_MIN_LEN {
        base = FALLBACK_USERNAME.to_string();
    }
    base
}

fn with_random_suffix(base: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{base}{suffix:04}")
}

fn fallback_username(base: &str, record_id: &str) -> String {
    let tail: String = record_id
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(8)
        .collect();
    let mut name = format!("{base}_{tail}");
    name.truncate(USERNAME_MAX_LEN);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_from_display_name_first() {
        assert_eq!(derive_username(Some("Night Owl"), "x@y.z"), "night_owl");
    }

    #[test]
    fn falls_back_to_email_local_part() {
        assert_eq!(derive_username(None, "Luna.Dreams@example.com"), "lunadreams");
        assert_eq!(derive_username(Some("   "), "luna@example.com"), "luna");
    }

    #[test]
    fn too_short_sources_become_dreamer() {
        assert_eq!(derive_username(Some("は"), "は@example.com"), "dreamer");
    }

    #[test]
    fn long_sources_leave_room_for_a_suffix() {
        let base = derive_username(Some(&"a".repeat(40)), "x@y.z");
        assert_eq!(base.len(), USERNAME_MAX_LEN - SUFFIX_DIGITS);
        assert!(User::is_valid_username(&format!("{base}0042")));
    }

    #[test]
    fn fallback_is_deterministic_and_valid() {
        let a = fallback_username("night_owl", "3f9c1d2e-aaaa");
        let b = fallback_username("night_owl", "3f9c1d2e-aaaa");
        assert_eq!(a, b);
        assert_eq!(a, "night_owl_3f9c1d2e");
        assert!(User::is_valid_username(&a));
    }
}
