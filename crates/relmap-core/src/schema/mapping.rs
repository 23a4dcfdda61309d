use super::Relationship;
use crate::{Error, Key, Result, Row};

use indexmap::IndexSet;
use std::fmt;

/// Describes how one table is read and written: its columns, its ordered
/// primary key and the relationships hanging off it.
#[derive(Debug, Clone)]
pub struct TableMapping {
    /// Uniquely identifies the mapping within the schema
    pub id: MappingId,

    /// Name of the mapped table
    pub table: String,

    /// Scalar columns, in table order. Always a superset of the primary key.
    pub columns: IndexSet<String>,

    /// Primary key columns, in key order
    pub primary_key: Vec<String>,

    /// Column whose value the database generates on insert
    pub auto_increment: Option<String>,

    /// Relationships, in declaration order. The position of a relationship
    /// determines its join alias.
    pub relationships: Vec<Relationship>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct MappingId(pub usize);

impl TableMapping {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn relationship(&self, member: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|relationship| relationship.member() == member)
    }

    /// Extracts the primary key of `row`. Returns `None` unless every key
    /// column is present and non-null.
    pub fn key_of(&self, row: &Row) -> Option<Key> {
        let mut values = Vec::with_capacity(self.primary_key.len());

        for column in &self.primary_key {
            match row.get(column) {
                Some(value) if !value.is_null() => values.push(value.clone()),
                _ => return None,
            }
        }

        Some(Key::new(values))
    }

    /// Checks that `key` has one value per primary key column.
    pub fn check_key(&self, key: &Key) -> Result<()> {
        if key.len() != self.primary_key.len() {
            return Err(Error::wrong_key_length(
                &self.table,
                key.clone(),
                self.primary_key.len(),
            ));
        }

        Ok(())
    }

    /// Scalar columns of `row` that this mapping knows about, in mapping
    /// order.
    pub fn known_columns<'a>(&'a self, row: &'a Row) -> impl Iterator<Item = &'a str> + 'a {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(move |column| row.contains(column))
    }
}

impl MappingId {
    /// Index of the mapping in the schema arena
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<&TableMapping> for MappingId {
    fn from(value: &TableMapping) -> Self {
        value.id
    }
}

impl fmt::Debug for MappingId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "MappingId({})", self.0)
    }
}
