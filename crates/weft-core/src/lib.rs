pub mod cascade;
pub use cascade::{CascadePlan, ChildSource};

pub mod driver;
pub use driver::{Connection, Driver};

mod error;
pub use error::{AssociationErrorKind, Error, IntoError};

pub mod schema;
pub use schema::Schema;

pub mod stmt;

/// A Result type alias that uses Weft's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
