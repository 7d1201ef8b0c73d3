//! Storage adapter interface.
//!
//! The engine talks to storage exclusively through [`Connection::exec`]. Every
//! suspension point in the engine is one of these calls.

mod operation;
pub use operation::{Cascade, Operation, Transaction, Write, WriteMode};

mod response;
pub use response::{Response, Rows};

use crate::{async_trait, Result, Schema};

use std::{fmt::Debug, sync::Arc};

#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Opens a new connection. Connections are independent: a transaction
    /// started on one is not visible to another until it commits.
    async fn connect(&self) -> Result<Box<dyn Connection>>;
}

#[async_trait]
pub trait Connection: Debug + Send + 'static {
    /// Execute a storage operation
    async fn exec(&mut self, schema: &Arc<Schema>, op: Operation) -> Result<Response>;
}

#[async_trait]
impl<T: Driver> Driver for Arc<T> {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        T::connect(self).await
    }
}
