use super::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Error reported by the database driver, kept as the source.
#[derive(Debug)]
pub(super) struct DriverFailure {
    /// The driver's message with the messages of its causes appended
    message: Box<str>,
    source: BoxedSource,
}

impl DriverFailure {
    fn new(source: BoxedSource) -> DriverFailure {
        let mut message = source.to_string();

        let mut cause = source.source();
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }

        DriverFailure {
            message: message.into(),
            source,
        }
    }
}

impl std::error::Error for DriverFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

impl core::fmt::Display for DriverFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error {
    /// Wraps an error raised by a driver. Used with `map_err` at every
    /// driver call site.
    pub fn driver(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::from(super::ErrorKind::Driver(DriverFailure::new(Box::new(err))))
    }

    pub fn is_driver(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Driver(_))
    }

    /// The driver's own error, for downcasting to the driver's error type.
    pub fn driver_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self.kind() {
            super::ErrorKind::Driver(err) => Some(&*err.source),
            _ => None,
        }
    }
}
