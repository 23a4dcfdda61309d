use relmap_core::Value as CoreValue;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};

/// Binds a relmap value as a SQLite parameter.
#[derive(Debug)]
pub(crate) struct Value<'a>(&'a CoreValue);

impl<'a> From<&'a CoreValue> for Value<'a> {
    fn from(value: &'a CoreValue) -> Self {
        Self(value)
    }
}

impl Value<'_> {
    /// Converts a SQLite value within a row to a relmap value.
    ///
    /// SQLite has no boolean storage class, so booleans read back as
    /// integers.
    pub(crate) fn from_sql(value: ValueRef<'_>) -> CoreValue {
        match value {
            ValueRef::Null => CoreValue::Null,
            ValueRef::Integer(value) => CoreValue::I64(value),
            ValueRef::Real(value) => CoreValue::F64(value),
            ValueRef::Text(value) => CoreValue::String(String::from_utf8_lossy(value).into_owned()),
            ValueRef::Blob(value) => CoreValue::Bytes(value.to_vec()),
        }
    }
}

impl ToSql for Value<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            CoreValue::Bool(true) => ToSqlOutput::Owned(SqlValue::Integer(1)),
            CoreValue::Bool(false) => ToSqlOutput::Owned(SqlValue::Integer(0)),
            CoreValue::I64(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            CoreValue::F64(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            CoreValue::String(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            CoreValue::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(&v[..])),
            CoreValue::Null => ToSqlOutput::Owned(SqlValue::Null),
        })
    }
}
