//! Sqlite-backed [`LocalStore`] for one record type.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use nocturne_core::sync::{Document, LocalStore, SyncableRecord};
use nocturne_core::SyncError;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::model::RecordRow;
use crate::schema::records;

/// One collection of syncable records persisted in the shared `records`
/// table. Instances for different types share the pool and the writer.
pub struct SqliteRecordStore<T: SyncableRecord> {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    _marker: PhantomData<fn() -> T>,
}

impl<T: SyncableRecord> SqliteRecordStore<T> {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self {
            pool,
            writer,
            _marker: PhantomData,
        }
    }
}

fn parse_timestamp(collection: &str, id: &str, raw: &str) -> nocturne_core::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| SyncError::decode(collection, id, format!("bad timestamp '{raw}': {e}")))
}

fn row_to_record<T: SyncableRecord>(row: RecordRow) -> nocturne_core::Result<T> {
    let payload: Document = serde_json::from_str(&row.payload)
        .map_err(|e| SyncError::decode(T::COLLECTION, &row.id, e.to_string()))?;
    let mut record = T::from_remote(&row.id, &payload)?;
    record.set_sync_status(row.sync_status.parse()?);
    record.set_last_synced_at(match &row.last_synced_at {
        Some(raw) => Some(parse_timestamp(T::COLLECTION, &row.id, raw)?),
        None => None,
    });
    Ok(record)
}

fn record_to_row<T: SyncableRecord>(record: &T) -> RecordRow {
    RecordRow {
        collection: T::COLLECTION.to_string(),
        id: record.id().to_string(),
        payload: serde_json::Value::Object(record.to_remote()).to_string(),
        updated_at: record.updated_at().to_rfc3339(),
        last_synced_at: record.last_synced_at().map(|at| at.to_rfc3339()),
        sync_status: record.sync_status().as_str().to_string(),
    }
}

#[async_trait]
impl<T: SyncableRecord> LocalStore<T> for SqliteRecordStore<T> {
    async fn fetch_all(&self) -> nocturne_core::Result<Vec<T>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = records::table
            .filter(records::collection.eq(T::COLLECTION))
            .order(records::updated_at.asc())
            .load::<RecordRow>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn get(&self, id: &str) -> nocturne_core::Result<Option<T>> {
        let mut conn = get_connection(&self.pool)?;
        let row = records::table
            .find((T::COLLECTION, id))
            .first::<RecordRow>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(row_to_record).transpose()
    }

    async fn upsert(&self, record: &T) -> nocturne_core::Result<()> {
        let row = record_to_row(record);
        self.writer
            .exec(move |conn| {
                diesel::insert_into(records::table)
                    .values(&row)
                    .on_conflict((records::collection, records::id))
                    .do_update()
                    .set(&row)
                    .execute(conn)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> nocturne_core::Result<()> {
        let id = id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(records::table.find((T::COLLECTION, id)))
                    .execute(conn)?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}
