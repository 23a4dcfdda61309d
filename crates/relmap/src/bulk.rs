//! Batched writes.
//!
//! Statements are split so that none binds more parameters than the
//! connection's [`Capability::max_params`](crate::driver::Capability).

use crate::{Connection, Error, Key, Result, Row, Value};

use indexmap::IndexMap;
use relmap_sql::{
    stmt::{Delete, Filter, Insert, Update},
    Serializer, Statement,
};
use tracing::debug;

/// Issues batched `INSERT`, `UPDATE`, `REPLACE` and `DELETE` statements on
/// one connection.
#[derive(Debug)]
pub struct BulkDataManager<'a> {
    connection: &'a mut dyn Connection,
    serializer: Serializer,
}

impl<'a> BulkDataManager<'a> {
    pub fn new(connection: &'a mut dyn Connection) -> Self {
        let serializer = Serializer::for_capability(connection.capability());
        Self {
            connection,
            serializer,
        }
    }

    /// Inserts `rows` into `table`, writing the `columns` each row holds.
    ///
    /// Rows holding the same subset of `columns` share statements.
    pub async fn insert<S: AsRef<str>>(&mut self, table: &str, columns: &[S], rows: &[&Row]) -> Result<u64> {
        self.write(table, columns, None, rows).await
    }

    /// Inserts `rows`, replacing stored rows with the same `key`.
    pub async fn replace<S: AsRef<str>>(
        &mut self,
        table: &str,
        columns: &[S],
        key: &[S],
        rows: &[&Row],
    ) -> Result<u64> {
        let key = key.iter().map(|column| column.as_ref().to_string()).collect();
        self.write(table, columns, Some(key), rows).await
    }

    /// Updates the stored row matching each row's `key`, one statement per
    /// row. Rows with nothing besides their key are skipped.
    pub async fn update<S: AsRef<str>>(
        &mut self,
        table: &str,
        columns: &[S],
        key: &[S],
        rows: &[&Row],
    ) -> Result<u64> {
        let mut count = 0;

        for row in rows {
            let key_values = key_values(table, key, row)?;

            let mut stmt = Update::new(table, Filter::columns_eq(key, &key_values));

            for column in columns {
                let column = column.as_ref();

                if key.iter().any(|k| k.as_ref() == column) {
                    continue;
                }

                if let Some(value) = row.get(column) {
                    stmt = stmt.set(column, value);
                }
            }

            if stmt.assignments.is_empty() {
                continue;
            }

            count += self.execute(stmt).await?;
        }

        debug!(table, rows = rows.len(), count, "relmap.bulk.update");
        Ok(count)
    }

    /// Deletes the rows of `table` whose `key` columns match any of `keys`.
    pub async fn delete<S: AsRef<str>>(&mut self, table: &str, key: &[S], keys: &[Key]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut count = 0;

        for chunk in keys.chunks(self.chunk_size(key.len())) {
            count += self
                .execute(Delete::new(table, Filter::keys(key, chunk)))
                .await?;
        }

        debug!(table, keys = keys.len(), count, "relmap.bulk.delete");
        Ok(count)
    }

    /// Serializes and runs a single statement.
    pub async fn execute(&mut self, stmt: impl Into<Statement>) -> Result<u64> {
        let stmt = stmt.into();

        let mut params: Vec<Value> = vec![];
        let sql = self.serializer.serialize(&stmt, &mut params);

        self.connection.execute(&sql, &params).await
    }

    async fn write<S: AsRef<str>>(
        &mut self,
        table: &str,
        columns: &[S],
        upsert: Option<Vec<String>>,
        rows: &[&Row],
    ) -> Result<u64> {
        // Group rows by the columns they hold, in first-seen order.
        let mut groups: IndexMap<Vec<&str>, Vec<&Row>> = IndexMap::new();

        for row in rows {
            let present: Vec<&str> = columns
                .iter()
                .map(AsRef::as_ref)
                .filter(|column| row.contains(column))
                .collect();

            if present.is_empty() {
                return Err(Error::invalid_statement(format!(
                    "cannot write a row without columns to `{table}`"
                )));
            }

            groups.entry(present).or_default().push(*row);
        }

        let mut count = 0;

        for (present, rows) in groups {
            for chunk in rows.chunks(self.chunk_size(present.len())) {
                let mut stmt = Insert::new(table, present.iter().map(|c| c.to_string()).collect());

                for row in chunk {
                    let values = present
                        .iter()
                        .map(|column| row.get(column).cloned().unwrap_or_default())
                        .collect();
                    stmt = stmt.row(values);
                }

                if let Some(key) = &upsert {
                    stmt = stmt.upsert(key.clone());
                }

                count += self.execute(stmt).await?;
            }
        }

        debug!(
            table,
            rows = rows.len(),
            count,
            replace = upsert.is_some(),
            "relmap.bulk.insert"
        );
        Ok(count)
    }

    /// Number of rows (or keys) of `width` values that fit one statement.
    fn chunk_size(&self, width: usize) -> usize {
        (self.connection.capability().max_params / width.max(1)).max(1)
    }
}

fn key_values<S: AsRef<str>>(table: &str, key: &[S], row: &Row) -> Result<Vec<Value>> {
    key.iter()
        .map(|column| match row.get(column.as_ref()) {
            Some(value) if !value.is_null() => Ok(value.clone()),
            _ => Err(Error::invalid_statement(format!(
                "row of `{table}` is missing primary key column `{}`",
                column.as_ref()
            ))),
        })
        .collect()
}
