//! Atomic execution of ordered, named steps.
//!
//! A [`Plan`] runs inside a single storage transaction. Steps run strictly in
//! order, each seeing the [`Results`] of the steps before it. The first
//! failure aborts the plan and rolls back everything it wrote.

mod exec;
pub(crate) use exec::run;

mod plan;
pub use plan::{Action, CancelHandle, Plan};

mod results;
pub use results::Results;

mod state;
pub use state::{Aborted, TerminalState};

use crate::{changeset::Changeset, engine::Engine};

use weft_core::{
    driver::{Operation, Transaction as TransactionOp},
    err,
    schema::ModelId,
    stmt::{Query, Value, ValueRecord},
    Connection, Result,
};

/// An open storage transaction on a dedicated connection.
///
/// If dropped without calling [`commit`](Self::commit) or
/// [`rollback`](Self::rollback), the transaction is rolled back on the tokio
/// runtime.
pub(crate) struct Transaction {
    engine: Engine,

    /// `Option` so that `Drop` can move it into a spawned task
    connection: Option<Box<dyn Connection>>,

    /// Whether commit or rollback has been called
    finished: bool,
}

impl Transaction {
    pub(crate) async fn begin(engine: &Engine) -> Result<Transaction> {
        let mut connection = engine.connect().await?;

        connection
            .exec(&engine.schema, TransactionOp::Start.into())
            .await?;

        tracing::debug!("transaction started");

        Ok(Transaction {
            engine: engine.clone(),
            connection: Some(connection),
            finished: false,
        })
    }

    fn parts(&mut self) -> Result<(&Engine, &mut dyn Connection)> {
        let connection = self
            .connection
            .as_deref_mut()
            .ok_or_else(|| err!("transaction connection already released"))?;
        Ok((&self.engine, connection))
    }

    pub(crate) async fn persist(&mut self, changeset: Changeset) -> Result<Option<ValueRecord>> {
        let (engine, conn) = self.parts()?;
        engine.persist(conn, changeset).await
    }

    pub(crate) async fn delete(&mut self, model: ModelId, key: Value) -> Result<u64> {
        let (engine, conn) = self.parts()?;
        engine.delete(conn, model, key).await
    }

    /// Reads through the transaction, preloads included.
    pub(crate) async fn read(&mut self, query: &Query) -> Result<Vec<ValueRecord>> {
        let (engine, conn) = self.parts()?;
        engine.read(conn, query, false).await
    }

    pub(crate) async fn get(&mut self, query: Query, key: &Value) -> Result<ValueRecord> {
        let (engine, conn) = self.parts()?;
        engine.get(conn, query, key).await
    }

    async fn exec(&mut self, op: TransactionOp) -> Result<()> {
        let (engine, conn) = self.parts()?;
        conn.exec(&engine.schema, Operation::Transaction(op)).await?;
        Ok(())
    }

    pub(crate) async fn commit(mut self) -> Result<()> {
        self.exec(TransactionOp::Commit).await?;
        self.finished = true;
        tracing::info!("transaction committed");
        Ok(())
    }

    pub(crate) async fn rollback(mut self) -> Result<()> {
        self.exec(TransactionOp::Rollback).await?;
        self.finished = true;
        tracing::info!("transaction rolled back");
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let Some(mut connection) = self.connection.take() else {
            return;
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("open transaction dropped outside a tokio runtime; rollback skipped");
            return;
        };

        tracing::warn!("open transaction dropped; rolling back");

        let schema = self.engine.schema.clone();
        handle.spawn(async move {
            let _ = connection
                .exec(&schema, TransactionOp::Rollback.into())
                .await;
        });
    }
}
