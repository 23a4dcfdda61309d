mod arena;
mod assemble;
mod persist;
mod plan;
mod query;
mod rewrite;
mod save_data;
mod token;

pub(crate) use persist::PersistenceEngine;
pub(crate) use query::QueryEngine;

/// How [`Db::save_rows`](crate::Db::save_rows) writes rows.
///
/// Related rows are written with the same operation as their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOperation {
    /// Insert every row. Rows of auto-increment tables that lack a key
    /// receive the generated one.
    Insert,

    /// Update the stored row matching each row's primary key.
    Update,

    /// Insert rows, replacing stored rows that share a primary key.
    Replace,

    /// Update rows that are already stored and insert the rest. Related rows
    /// that were stored before but are no longer listed are deleted or
    /// unrelated, depending on the relationship's cascade policy.
    Save,
}
