//! Generic push/pull/reconcile orchestrator for one record type.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::errors::{Result, RetryClass, SyncError};

use super::clock::{Clock, SystemClock};
use super::network::{NetworkMonitor, NetworkStatus};
use super::record::{
    Document, SyncStatus, SyncableRecord, REMOTE_LAST_SYNCED_AT_KEY, REMOTE_SYNC_STATUS_KEY,
};
use super::stores::{LocalStore, RemoteChange, RemoteChangeKind, RemoteStore, SubscriptionHandle};

/// Outcome counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPassSummary {
    pub pushed: usize,
    pub deleted: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Sync engine for one record type.
///
/// Owns every `sync_status`/`last_synced_at` transition; application code
/// mutates domain fields and `updated_at` only. One engine instance per type;
/// the internal pass lock serializes reconciliation passes so a
/// monitor-triggered pass and a caller-triggered pass never interleave their
/// store writes.
pub struct SyncEngine<T: SyncableRecord> {
    local: Arc<dyn LocalStore<T>>,
    remote: Arc<dyn RemoteStore>,
    monitor: Arc<dyn NetworkMonitor>,
    clock: Arc<dyn Clock>,
    pass_lock: Mutex<()>,
}

impl<T: SyncableRecord> SyncEngine<T> {
    pub fn new(
        local: Arc<dyn LocalStore<T>>,
        remote: Arc<dyn RemoteStore>,
        monitor: Arc<dyn NetworkMonitor>,
    ) -> Self {
        Self::with_clock(local, remote, monitor, Arc::new(SystemClock))
    }

    pub fn with_clock(
        local: Arc<dyn LocalStore<T>>,
        remote: Arc<dyn RemoteStore>,
        monitor: Arc<dyn NetworkMonitor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            local,
            remote,
            monitor,
            clock,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn local(&self) -> &Arc<dyn LocalStore<T>> {
        &self.local
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Push one record to the remote store.
    ///
    /// Offline: the record is persisted as `PendingUpload` before
    /// [`SyncError::Offline`] is returned, so the mutation is never lost.
    /// Invalid records fail fast without any partial state written. A remote
    /// copy touched since the last sync is resolved through the
    /// last-writer-wins merge and the merged result is written on both sides.
    pub async fn sync(&self, record: T) -> Result<T> {
        if !self.monitor.current_status().is_online() {
            return self.queue_pending(record, SyncError::Offline).await;
        }
        record.validate()?;

        let id = record.id().to_string();
        let remote_doc = match self.remote.get_document(T::COLLECTION, &id).await {
            Ok(doc) => doc,
            Err(err) => return self.queue_pending(record, err).await,
        };

        let now = self.clock.now();
        let mut resolved = record;
        if let Some(doc) = remote_doc {
            match T::from_remote(&id, &doc) {
                Ok(remote_record) => {
                    if resolved.has_conflict_with(&remote_record) {
                        debug!(
                            "[Sync] {}/{} touched remotely since last sync, merging",
                            T::COLLECTION,
                            id
                        );
                        let prior_synced_at = resolved.last_synced_at();
                        resolved = resolved.merge_from(&remote_record, now);
                        // Stamped below once the remote write lands, so a
                        // requeued record still reads strictly newer than
                        // its last sync.
                        resolved.set_last_synced_at(prior_synced_at);
                    }
                }
                Err(err) => {
                    // Schema drift on the remote copy; push proceeds as if no
                    // usable remote state existed.
                    warn!(
                        "[Sync] ignoring undecodable remote copy of {}/{}: {}",
                        T::COLLECTION,
                        id,
                        err
                    );
                }
            }
        }

        let body = self.remote_body(&resolved, now);
        if let Err(err) = self.remote.set_document(T::COLLECTION, &id, body, true).await {
            return self.queue_pending(resolved, err).await;
        }

        resolved.set_sync_status(SyncStatus::Synced);
        resolved.set_last_synced_at(Some(now));
        self.local.upsert(&resolved).await?;
        Ok(resolved)
    }

    /// Delete a record locally and remotely.
    ///
    /// The local copy becomes a `PendingDelete` tombstone first; it is only
    /// removed once the remote delete is confirmed. Offline or transport
    /// failure leaves the tombstone queued for the next pass.
    pub async fn delete(&self, mut record: T) -> Result<()> {
        record.set_sync_status(SyncStatus::PendingDelete);
        self.local.upsert(&record).await?;

        if !self.monitor.current_status().is_online() {
            return Err(SyncError::Offline);
        }
        self.remote.delete_document(T::COLLECTION, record.id()).await?;
        self.local.remove(record.id()).await?;
        Ok(())
    }

    /// Full pull: list every remote document and reconcile each against the
    /// local copy. Returns the number of locally applied documents.
    ///
    /// Undecodable documents are skipped, never fatal. Local records with no
    /// remote counterpart are left untouched; deletions are only observed
    /// through the subscription's explicit delete events, so a partial
    /// listing is never misread as exhaustive.
    pub async fn fetch_changes(&self) -> Result<usize> {
        let docs = self.remote.query_collection(T::COLLECTION).await?;
        let mut applied = 0usize;
        for (id, doc) in docs {
            match T::from_remote(&id, &doc) {
                Ok(remote_record) => {
                    if self.adopt_remote(remote_record).await? {
                        applied += 1;
                    }
                }
                Err(err) => {
                    warn!(
                        "[Sync] skipping undecodable remote document {}/{}: {}",
                        T::COLLECTION,
                        id,
                        err
                    );
                }
            }
        }
        debug!(
            "[Sync] pull complete for {}: {} document(s) applied",
            T::COLLECTION,
            applied
        );
        Ok(applied)
    }

    /// Reconciliation pass: drain every locally pending record, pushing
    /// uploads and flushing tombstones, one record at a time in fetch order.
    ///
    /// No single bad record blocks the batch. Permanent failures park the
    /// record in `Error` status; transient ones leave it pending so the next
    /// pass retries. The batch itself only fails when the local store does.
    pub async fn sync_pending_changes(&self) -> Result<SyncPassSummary> {
        let _guard = self.pass_lock.lock().await;
        let mut summary = SyncPassSummary::default();

        if !self.monitor.current_status().is_online() {
            debug!(
                "[Sync] skipping pending pass for {}: offline",
                T::COLLECTION
            );
            return Ok(summary);
        }

        for record in self.local.fetch_all().await? {
            match record.sync_status() {
                SyncStatus::PendingUpload => {
                    let id = record.id().to_string();
                    let parked_copy = record.clone();
                    match self.sync(record).await {
                        Ok(_) => summary.pushed += 1,
                        Err(SyncError::Offline) => {
                            // Went offline mid-pass; the rest stays queued.
                            summary.skipped += 1;
                            break;
                        }
                        Err(err) => {
                            summary.failed += 1;
                            self.park_if_permanent(parked_copy, &err).await;
                            warn!(
                                "[Sync] push failed for {}/{}: {}",
                                T::COLLECTION,
                                id,
                                err
                            );
                        }
                    }
                }
                SyncStatus::PendingDelete => {
                    let id = record.id().to_string();
                    match self.flush_tombstone(&id).await {
                        Ok(()) => summary.deleted += 1,
                        Err(SyncError::Offline) => {
                            summary.skipped += 1;
                            break;
                        }
                        Err(err) => {
                            // Tombstone stays queued; deletes have no
                            // validation to fail permanently.
                            summary.failed += 1;
                            warn!(
                                "[Sync] remote delete failed for {}/{}: {}",
                                T::COLLECTION,
                                id,
                                err
                            );
                        }
                    }
                }
                SyncStatus::Synced | SyncStatus::Error => summary.skipped += 1,
            }
        }

        info!(
            "[Sync] pass complete for {}: pushed={} deleted={} failed={} skipped={}",
            T::COLLECTION,
            summary.pushed,
            summary.deleted,
            summary.failed,
            summary.skipped
        );
        Ok(summary)
    }

    /// Explicit retry of a record parked in `Error` status. Validation must
    /// pass before the record transitions back to `PendingUpload`.
    pub async fn retry(&self, mut record: T) -> Result<T> {
        record.validate()?;
        record.set_sync_status(SyncStatus::PendingUpload);
        self.local.upsert(&record).await?;
        self.sync(record).await
    }

    /// Wire the remote subscription into local application. Every inbound
    /// event runs through the same merge rule as [`Self::fetch_changes`];
    /// the listener path never blind-overwrites newer local state.
    pub async fn observe_changes(self: &Arc<Self>) -> Result<SubscriptionHandle> {
        let (tx, mut rx) = mpsc::channel::<RemoteChange>(64);
        let mut handle = self.remote.subscribe(T::COLLECTION, tx).await?;

        let engine = Arc::clone(self);
        handle.attach(tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                if let Err(err) = engine.apply_remote_change(change).await {
                    warn!(
                        "[Sync] failed to apply remote {} change: {}",
                        T::COLLECTION,
                        err
                    );
                }
            }
        }));
        Ok(handle)
    }

    /// React to connectivity transitions: an offline→online edge drains the
    /// pending queue.
    pub fn watch_connectivity(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut rx = engine.monitor.watch();
        tokio::spawn(async move {
            let mut previous = *rx.borrow();
            while rx.changed().await.is_ok() {
                let status = *rx.borrow_and_update();
                if previous == NetworkStatus::Offline && status == NetworkStatus::Online {
                    info!(
                        "[Sync] connectivity restored, draining pending {} changes",
                        T::COLLECTION
                    );
                    if let Err(err) = engine.sync_pending_changes().await {
                        warn!(
                            "[Sync] post-reconnect pass failed for {}: {}",
                            T::COLLECTION,
                            err
                        );
                    }
                }
                previous = status;
            }
        })
    }

    /// Whether any record is waiting for a push or a remote delete.
    pub async fn has_pending(&self) -> Result<bool> {
        Ok(self.local.fetch_all().await?.iter().any(|record| {
            matches!(
                record.sync_status(),
                SyncStatus::PendingUpload | SyncStatus::PendingDelete
            )
        }))
    }

    /// Merge-or-adopt one decoded remote record. Returns whether the local
    /// store changed.
    async fn adopt_remote(&self, remote_record: T) -> Result<bool> {
        let now = self.clock.now();
        match self.local.get(remote_record.id()).await? {
            None => {
                let mut adopted = remote_record;
                adopted.set_sync_status(SyncStatus::Synced);
                adopted.set_last_synced_at(Some(now));
                self.local.upsert(&adopted).await?;
                Ok(true)
            }
            Some(local) => {
                // A queued delete outranks remote edits until it flushes.
                if local.sync_status() == SyncStatus::PendingDelete {
                    return Ok(false);
                }
                if !local.has_conflict_with(&remote_record) {
                    return Ok(false);
                }
                if remote_record.updated_at() > local.updated_at() {
                    let merged = local.merge_from(&remote_record, now);
                    self.local.upsert(&merged).await?;
                    return Ok(true);
                }
                // The local copy wins and its fields still have to reach the
                // remote, so it stays queued for the push pass instead of
                // being stamped synced here. Parked records wait for an
                // explicit retry.
                if local.sync_status() == SyncStatus::Synced {
                    let mut queued = local;
                    queued.set_sync_status(SyncStatus::PendingUpload);
                    self.local.upsert(&queued).await?;
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }

    async fn apply_remote_change(&self, change: RemoteChange) -> Result<()> {
        match change.kind {
            RemoteChangeKind::Removed => {
                debug!(
                    "[Sync] remote delete observed for {}/{}",
                    T::COLLECTION,
                    change.id
                );
                self.local.remove(&change.id).await
            }
            RemoteChangeKind::Added | RemoteChangeKind::Modified => {
                let Some(doc) = change.doc else {
                    return Ok(());
                };
                match T::from_remote(&change.id, &doc) {
                    Ok(remote_record) => {
                        self.adopt_remote(remote_record).await?;
                        Ok(())
                    }
                    Err(err) => {
                        // Forward-compatibility: a payload this build cannot
                        // decode is skipped, not fatal to the listener.
                        warn!(
                            "[Sync] skipping undecodable remote event {}/{}: {}",
                            T::COLLECTION,
                            change.id,
                            err
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    /// Remote document body: domain fields plus the engine's bookkeeping.
    fn remote_body(&self, record: &T, now: DateTime<Utc>) -> Document {
        let mut body = record.to_remote();
        body.insert(
            REMOTE_SYNC_STATUS_KEY.to_string(),
            serde_json::Value::String(SyncStatus::Synced.as_str().to_string()),
        );
        body.insert(
            REMOTE_LAST_SYNCED_AT_KEY.to_string(),
            serde_json::Value::String(now.to_rfc3339()),
        );
        body
    }

    /// Persist a record back as `PendingUpload` before surfacing a transient
    /// failure, so the mutation survives for the next pass. Tombstones keep
    /// their `PendingDelete` status.
    async fn queue_pending(&self, mut record: T, err: SyncError) -> Result<T> {
        if record.sync_status() != SyncStatus::PendingDelete {
            record.set_sync_status(SyncStatus::PendingUpload);
        }
        self.local.upsert(&record).await?;
        Err(err)
    }

    async fn flush_tombstone(&self, id: &str) -> Result<()> {
        if !self.monitor.current_status().is_online() {
            return Err(SyncError::Offline);
        }
        self.remote.delete_document(T::COLLECTION, id).await?;
        self.local.remove(id).await
    }

    async fn park_if_permanent(&self, mut record: T, err: &SyncError) {
        if err.retry_class() != RetryClass::Permanent {
            return;
        }
        record.set_sync_status(SyncStatus::Error);
        if let Err(store_err) = self.local.upsert(&record).await {
            warn!(
                "[Sync] failed to park {}/{} in error status: {}",
                T::COLLECTION,
                record.id(),
                store_err
            );
        }
    }
}
