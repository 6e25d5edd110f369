//! Database model for the generic records table.

use diesel::prelude::*;

/// One stored record: the domain payload as JSON plus the sync bookkeeping
/// columns the engine filters and orders by.
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(primary_key(collection, id))]
#[diesel(table_name = crate::schema::records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecordRow {
    pub collection: String,
    pub id: String,
    pub payload: String,
    pub updated_at: String,
    pub last_synced_at: Option<String>,
    pub sync_status: String,
}
