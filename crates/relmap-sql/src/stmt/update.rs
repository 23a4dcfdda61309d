use super::{Filter, Value};

#[derive(Debug, Clone)]
pub struct Update {
    pub table: String,

    /// Columns to set. A null value is written as a `NULL` literal.
    pub assignments: Vec<(String, Value)>,

    pub filter: Filter,
}

impl Update {
    pub fn new(table: impl Into<String>, filter: Filter) -> Self {
        Self {
            table: table.into(),
            assignments: vec![],
            filter,
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }
}
