mod capability;
pub use capability::{Capability, Dialect};

use crate::{
    async_trait,
    schema::{Column, Table},
    Result, Row, Value,
};

use std::{borrow::Cow, fmt::Debug};

/// Opens connections to one database.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Returns the URL this driver connects to.
    fn url(&self) -> Cow<'_, str>;

    /// Describes the driver's capability, which informs SQL generation.
    fn capability(&self) -> &'static Capability;

    /// Creates a new connection to the database.
    async fn connect(&self) -> Result<Box<dyn Connection>>;
}

/// A single database connection.
///
/// Every operation is issued sequentially; the engine never has more than
/// one statement in flight on a connection.
#[async_trait]
pub trait Connection: Debug + Send + 'static {
    /// Describes the connection's capability, which informs SQL generation.
    fn capability(&self) -> &'static Capability;

    /// Runs a statement that returns rows. Result columns keep the names the
    /// database reports for them.
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Runs a statement that does not return rows, returning the number of
    /// affected rows.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Returns the columns of `table`, in table order.
    async fn table_column_metadata(&mut self, table: &str) -> Result<Vec<Column>>;

    /// Returns the metadata of `table`.
    ///
    /// The default implementation orders the primary key by column order;
    /// drivers that know the declared key order should override it.
    async fn table_metadata(&mut self, table: &str) -> Result<Table> {
        let columns = self.table_column_metadata(table).await?;
        Table::from_columns(table, columns)
    }

    /// Returns the key generated by the most recent insert on this
    /// connection.
    async fn last_auto_increment_id(&mut self) -> Result<Value>;
}
