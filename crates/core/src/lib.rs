//! nocturne-core: offline-first synchronization for the journaling app.
//!
//! The crate is storage- and transport-agnostic. [`sync::SyncEngine`] drives
//! push/pull/reconcile over the [`sync::LocalStore`] and [`sync::RemoteStore`]
//! capabilities; [`records`] holds the app's domain types.

pub mod errors;
pub mod records;
pub mod sync;

pub use errors::{Result, RetryClass, SyncError};
