//! Periodic reconciliation loop and retry pacing.

use std::sync::Arc;
use std::time::Duration;

use log::warn;
use rand::Rng;
use tokio::task::JoinHandle;

use super::engine::SyncEngine;
use super::record::SyncableRecord;

/// Baseline delay between reconciliation passes.
pub const SYNC_FOREGROUND_INTERVAL_SECS: u64 = 45;
/// Random jitter added to the baseline so several record types never fire in
/// lockstep.
pub const SYNC_INTERVAL_JITTER_SECS: u64 = 5;
/// Short interval used while pending work remains queued.
pub const SYNC_DRAIN_INTERVAL_SECS: u64 = 2;

const BACKOFF_MAX_EXPONENT: u32 = 8;
const BACKOFF_BASE_SECS: i64 = 5;

/// Exponential backoff for consecutive failed passes, capped at
/// `2^8 * 5 = 1280` seconds.
pub fn backoff_seconds(consecutive_failures: i32) -> i64 {
    let exponent = consecutive_failures.clamp(0, BACKOFF_MAX_EXPONENT as i32) as u32;
    2i64.pow(exponent) * BACKOFF_BASE_SECS
}

fn interval_jitter_ms() -> u64 {
    rand::thread_rng().gen_range(0..SYNC_INTERVAL_JITTER_SECS * 1000)
}

/// Spawn the background pass loop for one engine. The loop tightens its
/// interval while pending work remains and backs off after failed passes.
pub fn spawn_periodic<T: SyncableRecord>(engine: Arc<SyncEngine<T>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut consecutive_failures: i32 = 0;
        loop {
            match engine.sync_pending_changes().await {
                Ok(summary) => {
                    consecutive_failures = if summary.failed > 0 {
                        consecutive_failures.saturating_add(1)
                    } else {
                        0
                    };
                }
                Err(err) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    warn!("[Sync] scheduled pass failed for {}: {}", T::COLLECTION, err);
                }
            }

            let delay = if consecutive_failures > 0 {
                Duration::from_secs(backoff_seconds(consecutive_failures) as u64)
            } else if engine.has_pending().await.unwrap_or(false) {
                Duration::from_secs(SYNC_DRAIN_INTERVAL_SECS)
            } else {
                Duration::from_secs(SYNC_FOREGROUND_INTERVAL_SECS)
                    + Duration::from_millis(interval_jitter_ms())
            };
            tokio::time::sleep(delay).await;
        }
    })
}
