use super::Error;
use crate::Key;

/// Error when a lookup by primary key returns no row.
#[derive(Debug)]
pub(super) struct RecordNotFoundError {
    table: Box<str>,
    key: Key,
}

impl std::error::Error for RecordNotFoundError {}

impl core::fmt::Display for RecordNotFoundError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "record not found; table={} key={}", self.table, self.key)
    }
}

impl Error {
    /// Creates a record not found error for `key` in `table`.
    pub fn record_not_found(table: impl Into<String>, key: Key) -> Error {
        Error::from(super::ErrorKind::RecordNotFound(RecordNotFoundError {
            table: table.into().into(),
            key,
        }))
    }

    /// Returns `true` if this error is a record not found error.
    pub fn is_record_not_found(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::RecordNotFound(_))
    }

    /// The key that was not found, when this is a record not found error.
    pub fn missing_key(&self) -> Option<&Key> {
        match self.kind() {
            super::ErrorKind::RecordNotFound(err) => Some(&err.key),
            _ => None,
        }
    }
}
