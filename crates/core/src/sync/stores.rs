//! Capability traits for the local persistent store and the remote
//! document store. Both are external collaborators consumed through narrow
//! interfaces; implementations live in sibling crates.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::Result;

use super::record::{Document, SyncableRecord};

/// On-device persistent collection of one record type. Every write commits
/// atomically before the call returns.
#[async_trait]
pub trait LocalStore<T: SyncableRecord>: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<T>>;
    async fn get(&self, id: &str) -> Result<Option<T>>;
    async fn upsert(&self, record: &T) -> Result<()>;
    async fn remove(&self, id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteChangeKind {
    Added,
    Modified,
    Removed,
}

/// One remote document change delivered by a subscription.
#[derive(Debug, Clone)]
pub struct RemoteChange {
    pub id: String,
    pub kind: RemoteChangeKind,
    /// Document body; `None` for removals.
    pub doc: Option<Document>,
}

/// Network document store: per-collection, per-document operations plus a
/// live change subscription. All operations may fail with
/// [`crate::SyncError::Network`], which the engine treats as transient.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Write a document. With `merge = true` the write is a field-level
    /// upsert: fields absent from `doc` are preserved remotely, not clobbered.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        merge: bool,
    ) -> Result<()>;

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()>;

    async fn query_collection(&self, collection: &str) -> Result<Vec<(String, Document)>>;

    /// Start delivering change events for `collection` into `tx`, in
    /// server-observed order. The returned handle stops delivery when
    /// dropped.
    async fn subscribe(
        &self,
        collection: &str,
        tx: mpsc::Sender<RemoteChange>,
    ) -> Result<SubscriptionHandle>;
}

/// Handle owning the background task(s) behind a subscription. Dropping the
/// handle aborts them.
#[derive(Default)]
pub struct SubscriptionHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// A handle with no tasks, for implementations that deliver events
    /// without a dedicated poller.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(task: JoinHandle<()>) -> Self {
        Self { tasks: vec![task] }
    }

    pub fn attach(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    pub fn stop(self) {
        // Drop aborts.
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
