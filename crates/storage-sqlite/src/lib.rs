//! Sqlite persistence for nocturne records.
//!
//! One shared `records` table keyed by `(collection, id)`; payloads stored as
//! JSON. All writes go through a single writer thread, reads go through the
//! r2d2 pool.

pub mod db;
pub mod errors;
pub mod model;
pub mod schema;
pub mod store;

pub use db::{create_pool, get_connection, run_migrations, spawn_writer, DbPool, WriteHandle};
pub use errors::StorageError;
pub use store::SqliteRecordStore;
