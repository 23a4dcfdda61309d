mod value;
use value::Value;

use relmap_core::{
    async_trait,
    driver::{Capability, Driver},
    schema::{Column, Table},
    Error, Result, Row,
};
use rusqlite::{params_from_iter, Connection as RusqliteConnection};
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver with an arbitrary connection URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(|err| {
            Error::invalid_connection_url(format!("{err}; url={url_str}"))
        })?;

        if url.scheme() != "sqlite" {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `sqlite` scheme; url={url_str}"
            )));
        }

        if url.path() == ":memory:" {
            Ok(Self::InMemory)
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn url(&self) -> Cow<'_, str> {
        match self {
            Sqlite::InMemory => Cow::Borrowed("sqlite::memory:"),
            Sqlite::File(path) => Cow::Owned(format!("sqlite:{}", path.display())),
        }
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn connect(&self) -> Result<Box<dyn relmap_core::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

/// One row of `PRAGMA table_info`
struct ColumnInfo {
    column: Column,

    /// 1-based position within the primary key, 0 when not part of it
    pk_index: i64,

    declared_type: String,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection = RusqliteConnection::open_in_memory().map_err(Error::driver)?;
        Ok(Self { connection })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::driver)?;
        Ok(Self { connection })
    }

    /// Runs semicolon separated statements without parameters, e.g. a
    /// schema script.
    pub fn execute_batch(&mut self, sql: &str) -> Result<()> {
        debug!(sql = %sql, "relmap.sqlite.batch");
        self.connection.execute_batch(sql).map_err(Error::driver)
    }

    fn table_info(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        let sql = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
        debug!(sql = %sql, "relmap.sqlite.metadata");

        let mut stmt = self.connection.prepare(&sql).map_err(Error::driver)?;
        let mut rows = stmt.query([]).map_err(Error::driver)?;
        let mut columns = vec![];

        while let Some(row) = rows.next().map_err(Error::driver)? {
            let name: String = row.get("name").map_err(Error::driver)?;
            let declared_type: String = row.get("type").map_err(Error::driver)?;
            let not_null: bool = row.get("notnull").map_err(Error::driver)?;
            let pk_index: i64 = row.get("pk").map_err(Error::driver)?;

            let mut column = Column::new(name);
            if pk_index > 0 {
                column = column.primary_key();
            } else if not_null {
                column = column.not_null();
            }

            columns.push(ColumnInfo {
                column,
                pk_index,
                declared_type,
            });
        }

        // A lone `INTEGER PRIMARY KEY` column aliases the rowid, which
        // SQLite assigns on insert.
        let mut key_columns = columns.iter_mut().filter(|info| info.pk_index > 0);
        if let (Some(info), None) = (key_columns.next(), key_columns.next()) {
            if info.declared_type.eq_ignore_ascii_case("INTEGER") {
                info.column.auto_increment = true;
            }
        }

        Ok(columns)
    }
}

#[async_trait]
impl relmap_core::Connection for Connection {
    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn query(&mut self, sql: &str, params: &[relmap_core::Value]) -> Result<Vec<Row>> {
        debug!(sql = %sql, params = params.len(), "relmap.sqlite.query");

        let mut stmt = self.connection.prepare_cached(sql).map_err(Error::driver)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter().map(Value::from)))
            .map_err(Error::driver)?;

        let mut ret = vec![];

        while let Some(row) = rows.next().map_err(Error::driver)? {
            let mut record = Row::new();

            for (index, name) in names.iter().enumerate() {
                let value = row.get_ref(index).map_err(Error::driver)?;
                record.set(name.as_str(), Value::from_sql(value));
            }

            ret.push(record);
        }

        Ok(ret)
    }

    async fn execute(&mut self, sql: &str, params: &[relmap_core::Value]) -> Result<u64> {
        debug!(sql = %sql, params = params.len(), "relmap.sqlite.execute");

        let mut stmt = self.connection.prepare_cached(sql).map_err(Error::driver)?;
        let count = stmt
            .execute(params_from_iter(params.iter().map(Value::from)))
            .map_err(Error::driver)?;

        Ok(count as u64)
    }

    async fn table_column_metadata(&mut self, table: &str) -> Result<Vec<Column>> {
        Ok(self
            .table_info(table)?
            .into_iter()
            .map(|info| info.column)
            .collect())
    }

    async fn table_metadata(&mut self, table: &str) -> Result<Table> {
        let mut columns = self.table_info(table)?;

        let mut key: Vec<_> = columns
            .iter()
            .filter(|info| info.pk_index > 0)
            .map(|info| (info.pk_index, info.column.name.clone()))
            .collect();
        key.sort();

        let mut metadata = Table::from_columns(table, columns.drain(..).map(|info| info.column).collect())?;
        metadata.primary_key = key.into_iter().map(|(_, name)| name).collect();
        Ok(metadata)
    }

    async fn last_auto_increment_id(&mut self) -> Result<relmap_core::Value> {
        Ok(relmap_core::Value::I64(self.connection.last_insert_rowid()))
    }
}
