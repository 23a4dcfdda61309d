use super::Value;

#[derive(Debug, Clone)]
pub struct Insert {
    pub table: String,

    /// Columns, shared by every row
    pub columns: Vec<String>,

    /// One value per column, per row
    pub rows: Vec<Vec<Value>>,

    /// When set, rows whose key already exists replace the stored row
    /// instead of failing.
    pub upsert: Option<Upsert>,
}

#[derive(Debug, Clone)]
pub struct Upsert {
    /// The conflict target: the table's primary key columns
    pub key: Vec<String>,
}

impl Insert {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: vec![],
            upsert: None,
        }
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push(values);
        self
    }

    pub fn upsert(mut self, key: Vec<String>) -> Self {
        self.upsert = Some(Upsert { key });
        self
    }
}
