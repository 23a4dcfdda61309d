mod builder;
mod connect;

pub use builder::Builder;
pub use connect::*;

use crate::{
    engine::{PersistenceEngine, QueryEngine},
    BulkDataManager, Connection, Error, Key, Result, Row, SaveOperation, Schema, Value,
};

use relmap_core::schema::MappingId;

use std::sync::Arc;

/// A database handle: a schema plus the connection every operation runs on.
///
/// Operations run their statements one after another on the connection and
/// are not atomic. Wrap calls in a transaction (e.g. with [`Db::execute`])
/// when all-or-nothing behavior is required.
#[derive(Debug)]
pub struct Db {
    schema: Arc<Schema>,
    connection: Box<dyn Connection>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Creates a handle from an already built schema. The schema may be
    /// shared with handles on other connections.
    pub fn new(schema: Arc<Schema>, connection: Box<dyn Connection>) -> Self {
        Self { schema, connection }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Looks up the mapping of `table`.
    pub fn mapping(&self, table: &str) -> Result<MappingId> {
        self.schema
            .mapping_by_table(table)
            .map(|mapping| mapping.id)
            .ok_or_else(|| Error::invalid_schema(format!("no mapping for table `{table}`")))
    }

    pub fn connection(&mut self) -> &mut dyn Connection {
        &mut *self.connection
    }

    pub fn into_connection(self) -> Box<dyn Connection> {
        self.connection
    }

    /// Runs a SQL statement or fragment against `mapping`, returning nested
    /// rows.
    ///
    /// `sql` is either a full `SELECT` over the mapping's table or a
    /// `WHERE` / `ORDER BY` / `LIMIT` / `OFFSET` fragment. Columns may be
    /// referenced bare (root table) or through relationship members, e.g.
    /// `children.name`.
    pub async fn query(&mut self, mapping: MappingId, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mapping = self.schema.mapping(mapping);
        QueryEngine::new(&self.schema, &mut *self.connection)
            .query(mapping, sql, params)
            .await
    }

    /// Loads the row with primary key `key`.
    pub async fn fetch(&mut self, mapping: MappingId, key: impl Into<Key>) -> Result<Row> {
        let mapping = self.schema.mapping(mapping);
        QueryEngine::new(&self.schema, &mut *self.connection)
            .fetch(mapping, &key.into())
            .await
    }

    /// Loads the rows with the given keys, in the order of `keys`.
    ///
    /// Missing keys are an error unless `ignore_missing` is set, in which
    /// case they are left out of the result.
    pub async fn multi_fetch(
        &mut self,
        mapping: MappingId,
        keys: &[Key],
        ignore_missing: bool,
    ) -> Result<Vec<Row>> {
        let mapping = self.schema.mapping(mapping);
        QueryEngine::new(&self.schema, &mut *self.connection)
            .multi_fetch(mapping, keys, ignore_missing)
            .await
    }

    /// Writes `rows` and the related rows nested in them.
    ///
    /// Generated keys are stored on the rows they belong to, including
    /// nested ones.
    pub async fn save_rows(&mut self, mapping: MappingId, rows: &mut [Row], op: SaveOperation) -> Result<()> {
        let mapping = self.schema.mapping(mapping);
        PersistenceEngine::new(&self.schema, &mut *self.connection)
            .save_rows(mapping, rows, op)
            .await
    }

    pub async fn save_row(&mut self, mapping: MappingId, row: &mut Row, op: SaveOperation) -> Result<()> {
        self.save_rows(mapping, std::slice::from_mut(row), op).await
    }

    /// Deletes `rows`, applying each relationship's cascade policy to the
    /// rows related to them.
    pub async fn delete_rows(&mut self, mapping: MappingId, rows: &[Row]) -> Result<()> {
        let mapping = self.schema.mapping(mapping);
        PersistenceEngine::new(&self.schema, &mut *self.connection)
            .delete_rows(mapping, rows)
            .await
    }

    /// Runs a statement that returns no rows, unchanged.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.connection.execute(sql, params).await
    }

    pub fn bulk(&mut self) -> BulkDataManager<'_> {
        BulkDataManager::new(&mut *self.connection)
    }
}

impl AsRef<Schema> for Db {
    fn as_ref(&self) -> &Schema {
        &self.schema
    }
}
