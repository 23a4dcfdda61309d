use super::Error;
use crate::Key;

/// Error when a supplied primary key does not have one value per primary key
/// column.
#[derive(Debug)]
pub(super) struct WrongKeyLengthError {
    table: Box<str>,
    key: Key,
    expected: usize,
}

impl std::error::Error for WrongKeyLengthError {}

impl core::fmt::Display for WrongKeyLengthError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "wrong primary key length; table={} key={} expected={}",
            self.table, self.key, self.expected
        )
    }
}

impl Error {
    /// Creates a wrong key length error.
    pub fn wrong_key_length(table: impl Into<String>, key: Key, expected: usize) -> Error {
        Error::from(super::ErrorKind::WrongKeyLength(WrongKeyLengthError {
            table: table.into().into(),
            key,
            expected,
        }))
    }

    /// Returns `true` if this error is a wrong key length error.
    pub fn is_wrong_key_length(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::WrongKeyLength(_))
    }
}
