mod builder;
pub use builder::Builder;

mod connect;
pub use connect::driver_for;

use crate::{
    changeset::{Action, Changeset},
    engine::Engine,
    transaction::{self, Plan, TerminalState, Transaction},
};

use std::{sync::Arc, time::Duration};
use weft_core::{
    schema::ModelId,
    stmt::{Query, Value, ValueRecord},
    Error, Result, Schema,
};

/// Settings shared by every clone of a [`Db`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Config {
    /// Upper bound on the run time of a plan
    pub(crate) transaction_timeout: Duration,

    /// Run separate preloads outside transactions concurrently
    pub(crate) concurrent_preload: bool,
}

/// A handle to a storage adapter and the entity registry it serves.
///
/// Cloning is cheap; clones share the driver. Every call opens its own
/// connection, so a `Db` can be used from many tasks at once.
#[derive(Debug, Clone)]
pub struct Db {
    engine: Engine,
    config: Config,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.engine.schema
    }

    pub fn transaction_timeout(&self) -> Duration {
        self.config.transaction_timeout
    }

    /// Entities matching `query`, preloads resolved.
    pub async fn all(&self, query: &Query) -> Result<Vec<ValueRecord>> {
        let mut conn = self.engine.connect().await?;
        self.engine
            .read(&mut *conn, query, self.config.concurrent_preload)
            .await
    }

    /// Rows exactly as the adapter returns them. Honours projections; joined
    /// rows are not folded.
    pub async fn rows(&self, query: &Query) -> Result<Vec<Value>> {
        let mut conn = self.engine.connect().await?;
        self.engine.rows(&mut *conn, query).await
    }

    /// The entity of `query`'s source with primary key `key`, with the
    /// query's preloads resolved.
    pub async fn get(&self, query: Query, key: impl Into<Value>) -> Result<ValueRecord> {
        let mut conn = self.engine.connect().await?;
        self.engine.get(&mut *conn, query, &key.into()).await
    }

    /// Submits an insert or update changeset, nested changesets included, in
    /// its own transaction. Returns the stored entity.
    pub async fn save(&self, changeset: Changeset) -> Result<ValueRecord> {
        if changeset.action() == Action::Delete {
            return Err(Error::invalid_statement(
                "changeset is marked for deletion; use `Db::delete`",
            ));
        }

        let mut tx = Transaction::begin(&self.engine).await?;

        match tx.persist(changeset).await {
            Ok(record) => {
                tx.commit().await?;
                record.ok_or_else(|| Error::invalid_statement("write produced no record"))
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(err = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Deletes one entity in its own transaction, applying the delete
    /// policies of its dependents.
    pub async fn delete(&self, model: impl Into<ModelId>, key: impl Into<Value>) -> Result<()> {
        let mut tx = Transaction::begin(&self.engine).await?;

        match tx.delete(model.into(), key.into()).await {
            Ok(_) => tx.commit().await,
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(err = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Runs `plan` atomically.
    pub async fn run(&self, plan: Plan) -> TerminalState {
        transaction::run(&self.engine, self.config.transaction_timeout, plan).await
    }
}
