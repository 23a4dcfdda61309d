use super::{Connect, Db};
use crate::{driver::Driver, Connection, Result};

use relmap_core::schema::{self, MappingId, Relationship, SchemaConfig};

use std::sync::Arc;
use tracing::debug;

/// Declares mappings, then connects and completes them from the database.
#[derive(Debug, Default)]
pub struct Builder {
    /// Schema builder
    core: schema::Builder,
}

impl Builder {
    /// Declares a mapping for `table`. See [`schema::Builder::mapping`].
    pub fn mapping(&mut self, table: impl Into<String>) -> MappingId {
        self.core.mapping(table)
    }

    pub fn columns<I, S>(&mut self, id: MappingId, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.core.columns(id, columns);
        self
    }

    pub fn primary_key<I, S>(&mut self, id: MappingId, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.core.primary_key(id, columns);
        self
    }

    pub fn auto_increment(&mut self, id: MappingId, column: impl Into<String>) -> &mut Self {
        self.core.auto_increment(id, column);
        self
    }

    pub fn relate(&mut self, id: MappingId, relationship: impl Into<Relationship>) -> &mut Self {
        self.core.relate(id, relationship);
        self
    }

    /// Declares the tables and relationships of a [`SchemaConfig`].
    pub fn load(&mut self, config: &SchemaConfig) -> Result<&mut Self> {
        self.core.load(config)?;
        Ok(self)
    }

    /// Connects to the database at `url` and builds the handle.
    pub async fn connect(self, url: &str) -> Result<Db> {
        let driver = Connect::new(url)?;
        debug!(url = %driver.url(), "relmap.connect");

        let connection = driver.connect().await?;
        self.build(connection).await
    }

    /// Builds the handle on an open connection, reading the metadata of any
    /// table whose columns or primary key were not declared.
    pub async fn build(self, mut connection: Box<dyn Connection>) -> Result<Db> {
        let schema = self.core.build_with(&mut *connection).await?;
        Ok(Db::new(Arc::new(schema), connection))
    }
}
