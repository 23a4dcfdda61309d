use super::Column;
use crate::{Error, Result};

/// Metadata describing a database table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Name of the table
    pub name: String,

    /// The table's columns, in table order
    pub columns: Vec<Column>,

    /// Primary key column names, in key order
    pub primary_key: Vec<String>,
}

impl Table {
    /// Builds table metadata from its column list, taking the primary key in
    /// column order.
    pub fn from_columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();

        if columns.is_empty() {
            return Err(Error::invalid_schema(format!(
                "table `{name}` does not exist or has no columns"
            )));
        }

        let primary_key = columns
            .iter()
            .filter(|column| column.primary_key)
            .map(|column| column.name.clone())
            .collect();

        Ok(Self {
            name,
            columns,
            primary_key,
        })
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// The auto-increment column, if the table has one.
    pub fn auto_increment(&self) -> Option<&Column> {
        self.columns.iter().find(|column| column.auto_increment)
    }
}
