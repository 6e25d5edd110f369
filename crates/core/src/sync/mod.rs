//! Sync contract, conflict policy, and the generic engine.

pub mod clock;
pub mod conflict;
pub mod engine;
pub mod network;
pub mod record;
pub mod scheduler;
pub mod stores;
pub mod user_service;

pub use clock::{Clock, SystemClock};
pub use engine::{SyncEngine, SyncPassSummary};
pub use network::{NetworkMonitor, NetworkStatus, SharedNetworkMonitor};
pub use record::{Document, SyncStatus, SyncableRecord};
pub use stores::{LocalStore, RemoteChange, RemoteChangeKind, RemoteStore, SubscriptionHandle};
pub use user_service::{UserSyncService, MAX_USERNAME_ATTEMPTS};
