use crate::Value;

use indexmap::IndexMap;

/// A table row: ordered scalar columns plus the nested data of any
/// relationship members that were loaded or are being saved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: IndexMap<String, Value>,
    related: IndexMap<String, Related>,
}

/// Nested data stored under a relationship member.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// A to-one relationship; `None` when no related row exists.
    One(Option<Row>),

    /// A to-many relationship, in result order.
    Many(Vec<Row>),
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Sets a column, returning the previous value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.columns.insert(column.into(), value.into())
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.columns.shift_remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn columns(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> + '_ {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn column_names(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// True when every column value is null (or there are no columns).
    pub fn is_all_null(&self) -> bool {
        self.columns.values().all(Value::is_null)
    }

    pub fn related(&self, member: &str) -> Option<&Related> {
        self.related.get(member)
    }

    pub fn related_mut(&mut self, member: &str) -> Option<&mut Related> {
        self.related.get_mut(member)
    }

    pub fn set_related(&mut self, member: impl Into<String>, related: Related) -> Option<Related> {
        self.related.insert(member.into(), related)
    }

    pub fn remove_related(&mut self, member: &str) -> Option<Related> {
        self.related.shift_remove(member)
    }

    pub fn related_members(&self) -> impl ExactSizeIterator<Item = (&str, &Related)> + '_ {
        self.related.iter().map(|(name, related)| (name.as_str(), related))
    }

    /// The row stored under a to-one member, if any.
    pub fn one(&self, member: &str) -> Option<&Row> {
        match self.related.get(member)? {
            Related::One(row) => row.as_ref(),
            Related::Many(_) => None,
        }
    }

    /// The rows stored under a to-many member. Returns `None` when the member
    /// is absent or is a to-one member.
    pub fn many(&self, member: &str) -> Option<&[Row]> {
        match self.related.get(member)? {
            Related::Many(rows) => Some(rows),
            Related::One(_) => None,
        }
    }

    pub fn many_mut(&mut self, member: &str) -> Option<&mut Vec<Row>> {
        match self.related.get_mut(member)? {
            Related::Many(rows) => Some(rows),
            Related::One(_) => None,
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn with_one(mut self, member: impl Into<String>, row: Option<Row>) -> Self {
        self.set_related(member, Related::One(row));
        self
    }

    pub fn with_many(mut self, member: impl Into<String>, rows: Vec<Row>) -> Self {
        self.set_related(member, Related::Many(rows));
        self
    }

    /// Splits the row into its scalar columns and its nested members.
    pub fn into_parts(self) -> (IndexMap<String, Value>, IndexMap<String, Related>) {
        (self.columns, self.related)
    }

    pub fn from_parts(columns: IndexMap<String, Value>, related: IndexMap<String, Related>) -> Self {
        Self { columns, related }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

impl Related {
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(row) => usize::from(row.is_some()),
            Self::Many(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> std::slice::Iter<'_, Row> {
        match self {
            Self::One(row) => row.as_slice().iter(),
            Self::Many(rows) => rows.iter(),
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::One(row) => row.into_iter().collect(),
            Self::Many(rows) => rows,
        }
    }
}
