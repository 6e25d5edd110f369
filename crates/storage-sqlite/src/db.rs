//! Connection pool, embedded migrations, and the single-writer actor.
//!
//! Sqlite allows one writer at a time; every mutation is funneled through a
//! dedicated writer thread so concurrent engine passes queue instead of
//! hitting `SQLITE_BUSY`. Reads come straight off the pool.

use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::error;
use tokio::sync::{mpsc, oneshot};

use crate::errors::{Result, StorageError};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

const POOL_MAX_SIZE: u32 = 8;

#[derive(Debug)]
struct SqlitePragmas;

impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Build the connection pool for a database file path (or `:memory:`).
pub fn create_pool(database_url: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(POOL_MAX_SIZE)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .map_err(|e| StorageError::pool(e.to_string()))?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &Arc<DbPool>) -> Result<DbConnection> {
    pool.get().map_err(|e| StorageError::pool(e.to_string()))
}

/// Apply any pending embedded migrations.
pub fn run_migrations(pool: &Arc<DbPool>) -> Result<()> {
    let mut conn = get_connection(pool)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| StorageError::migration(e.to_string()))?;
    Ok(())
}

type WriteJob = Box<dyn FnOnce(&mut SqliteConnection) + Send + 'static>;

/// Handle to the single writer thread. Cheap to clone; every store instance
/// for the same database shares one.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<WriteJob>,
}

impl WriteHandle {
    /// Run `f` on the writer thread inside one immediate transaction and
    /// await its result.
    pub async fn exec<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<R> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: WriteJob = Box::new(move |conn| {
            let result = conn.immediate_transaction(f);
            let _ = reply_tx.send(result);
        });
        self.tx
            .send(job)
            .map_err(|_| StorageError::writer_closed("write actor stopped"))?;
        reply_rx
            .await
            .map_err(|_| StorageError::writer_closed("write actor dropped the job"))?
    }
}

/// Spawn the writer thread for a pool.
pub fn spawn_writer(pool: Arc<DbPool>) -> WriteHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<WriteJob>();
    std::thread::spawn(move || {
        while let Some(job) = rx.blocking_recv() {
            match get_connection(&pool) {
                Ok(mut conn) => job(&mut conn),
                // Dropping the job closes its reply channel; the caller sees
                // a WriterClosed error.
                Err(err) => error!("[Storage] writer could not get a connection: {err}"),
            }
        }
    });
    WriteHandle { tx }
}
