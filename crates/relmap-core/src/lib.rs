#[macro_use]
mod macros;

pub mod driver;
pub use driver::Connection;

mod error;
pub use error::{Error, IntoError};

mod key;
pub use key::Key;

mod row;
pub use row::{Related, Row};

pub mod schema;
pub use schema::Schema;

mod value;
pub use value::Value;

/// A Result type alias that uses relmap's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
