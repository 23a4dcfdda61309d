mod delete;
pub use delete::Delete;

mod filter;
pub use filter::Filter;

mod insert;
pub use insert::{Insert, Upsert};

mod update;
pub use update::Update;

pub use relmap_core::Value;

/// A write statement issued by the engine.
#[derive(Debug, Clone)]
pub enum Statement {
    Delete(Delete),
    Insert(Insert),
    Update(Update),
}

impl Statement {
    pub fn table(&self) -> &str {
        match self {
            Self::Delete(stmt) => &stmt.table,
            Self::Insert(stmt) => &stmt.table,
            Self::Update(stmt) => &stmt.table,
        }
    }

    /// Number of values the statement binds.
    pub fn param_count(&self) -> usize {
        match self {
            Self::Delete(stmt) => stmt.filter.param_count(),
            Self::Insert(stmt) => stmt.rows.iter().map(Vec::len).sum(),
            Self::Update(stmt) => {
                stmt.assignments
                    .iter()
                    .filter(|(_, value)| !value.is_null())
                    .count()
                    + stmt.filter.param_count()
            }
        }
    }
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Self::Delete(value)
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Self::Insert(value)
    }
}

impl From<Update> for Statement {
    fn from(value: Update) -> Self {
        Self::Update(value)
    }
}
