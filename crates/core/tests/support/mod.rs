//! In-memory store and clock doubles shared by the integration tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::{mpsc, Mutex};

use nocturne_core::errors::Result;
use nocturne_core::sync::{
    Clock, Document, LocalStore, RemoteChange, RemoteStore, SubscriptionHandle, SyncableRecord,
};
use nocturne_core::SyncError;

/// Deterministic clock, advanced explicitly by each test.
pub struct ManualClock {
    now: StdMutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: StdMutex::new(now),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// In-memory `LocalStore`.
pub struct MemoryLocalStore<T> {
    records: Mutex<BTreeMap<String, T>>,
}

impl<T: SyncableRecord> MemoryLocalStore<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
        }
    }

    pub async fn snapshot(&self) -> Vec<T> {
        self.records.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl<T: SyncableRecord> LocalStore<T> for MemoryLocalStore<T> {
    async fn fetch_all(&self) -> Result<Vec<T>> {
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<T>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn upsert(&self, record: &T) -> Result<()> {
        self.records
            .lock()
            .await
            .insert(record.id().to_string(), record.clone());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.records.lock().await.remove(id);
        Ok(())
    }
}

/// In-memory `RemoteStore` with merge-write semantics, a change-event
/// fan-out, and a switch that makes every request fail like a transport
/// outage.
pub struct MemoryRemoteStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Document>>>,
    subscribers: Mutex<BTreeMap<String, Vec<mpsc::Sender<RemoteChange>>>>,
    fail_requests: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(BTreeMap::new()),
            subscribers: Mutex::new(BTreeMap::new()),
            fail_requests: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_requests.store(failing, Ordering::SeqCst);
    }

    /// Fail mutating requests only, leaving reads working.
    pub fn set_failing_writes(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<()> {
        if self.fail_requests.load(Ordering::SeqCst) {
            Err(SyncError::network("simulated transport outage"))
        } else {
            Ok(())
        }
    }

    fn check_writable(&self) -> Result<()> {
        self.check_reachable()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(SyncError::network("simulated write rejection"))
        } else {
            Ok(())
        }
    }

    /// Write a document directly, bypassing the failure switch. Used to model
    /// writes made by other devices.
    pub async fn seed(&self, collection: &str, id: &str, doc: Document) {
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
    }

    pub async fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .lock()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Deliver one change event to every subscriber of `collection`.
    pub async fn emit(&self, collection: &str, change: RemoteChange) {
        let subscribers = self.subscribers.lock().await;
        if let Some(senders) = subscribers.get(collection) {
            for tx in senders {
                let _ = tx.send(change.clone()).await;
            }
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.check_reachable()?;
        Ok(self.document(collection, id).await)
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        merge: bool,
    ) -> Result<()> {
        self.check_writable()?;
        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(existing) if merge => {
                for (key, value) in doc {
                    existing.insert(key, value);
                }
            }
            _ => {
                docs.insert(id.to_string(), doc);
            }
        }
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.check_writable()?;
        if let Some(docs) = self.collections.lock().await.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn query_collection(&self, collection: &str) -> Result<Vec<(String, Document)>> {
        self.check_reachable()?;
        Ok(self
            .collections
            .lock()
            .await
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn subscribe(
        &self,
        collection: &str,
        tx: mpsc::Sender<RemoteChange>,
    ) -> Result<SubscriptionHandle> {
        self.check_reachable()?;
        self.subscribers
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(tx);
        Ok(SubscriptionHandle::empty())
    }
}
