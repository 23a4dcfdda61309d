use super::Value;

use relmap_core::Key;

/// A boolean condition over the columns of the statement's table.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`, or `column IS NULL` when the value is null
    Eq(String, Value),

    /// `column IN (values)`
    In(String, Vec<Value>),

    And(Vec<Filter>),

    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    /// Matches rows whose `columns` equal any of `keys`.
    ///
    /// Single column keys render as `IN`; composite keys as an `OR` of
    /// equality groups.
    pub fn keys<S: AsRef<str>>(columns: &[S], keys: &[Key]) -> Self {
        if let [column] = columns {
            return Self::In(
                column.as_ref().to_string(),
                keys.iter()
                    .filter_map(|key| key.values().first().cloned())
                    .collect(),
            );
        }

        Self::Or(
            keys.iter()
                .map(|key| Self::columns_eq(columns, key.values()))
                .collect(),
        )
    }

    /// `columns[0] = values[0] AND columns[1] = values[1] ...`
    pub fn columns_eq<S: AsRef<str>>(columns: &[S], values: &[Value]) -> Self {
        debug_assert_eq!(columns.len(), values.len());

        let mut operands: Vec<_> = columns
            .iter()
            .zip(values)
            .map(|(column, value)| Self::eq(column.as_ref(), value))
            .collect();

        if operands.len() == 1 {
            operands.remove(0)
        } else {
            Self::And(operands)
        }
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut operands) => {
                operands.push(other);
                Self::And(operands)
            }
            filter => Self::And(vec![filter, other]),
        }
    }

    /// True when the filter can never match a row.
    pub fn is_false(&self) -> bool {
        match self {
            Self::In(_, values) => values.is_empty(),
            Self::Or(operands) => operands.iter().all(Filter::is_false),
            Self::And(operands) => operands.iter().any(Filter::is_false),
            Self::Eq(..) => false,
        }
    }

    /// Number of values the filter binds. Null equality binds nothing.
    pub fn param_count(&self) -> usize {
        match self {
            Self::Eq(_, value) => usize::from(!value.is_null()),
            Self::In(_, values) => values.len(),
            Self::And(operands) | Self::Or(operands) => {
                operands.iter().map(Filter::param_count).sum()
            }
        }
    }
}
