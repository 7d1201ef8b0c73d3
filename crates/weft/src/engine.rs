mod persist;
mod preload;

use crate::fold;

use std::sync::Arc;
use weft_core::{
    driver::{Operation, Write},
    stmt::{Query, Strategy, Value, ValueRecord},
    Connection, Driver, Error, Result, Schema,
};

/// Executes reads and writes against one driver. Cloning is cheap.
#[derive(Debug, Clone)]
pub(crate) struct Engine {
    pub(crate) schema: Arc<Schema>,

    pub(crate) driver: Arc<dyn Driver>,
}

impl Engine {
    pub(crate) fn new(schema: Arc<Schema>, driver: Arc<dyn Driver>) -> Engine {
        Engine { schema, driver }
    }

    pub(crate) async fn connect(&self) -> Result<Box<dyn Connection>> {
        self.driver.connect().await
    }

    /// Raw rows of `query`, as the adapter returns them.
    pub(crate) async fn rows(&self, conn: &mut dyn Connection, query: &Query) -> Result<Vec<Value>> {
        query.verify(&self.schema)?;

        tracing::debug!(query = %query.display(&self.schema), "read");

        let response = conn.exec(&self.schema, Operation::Read(query.clone())).await?;
        Ok(response.rows.into_values())
    }

    /// Entities matching `query` with their preloads resolved.
    ///
    /// Separate preloads run concurrently on fresh connections when
    /// `concurrent` is set, and sequentially on `conn` otherwise. Reads made
    /// inside a transaction must pass `false` so every read sees the
    /// transaction's snapshot.
    pub(crate) async fn read(
        &self,
        conn: &mut dyn Connection,
        query: &Query,
        concurrent: bool,
    ) -> Result<Vec<ValueRecord>> {
        let parents = self.load(conn, query).await?;

        let separate: Vec<_> = query
            .preloads
            .iter()
            .filter(|preload| preload.strategy == Strategy::Separate)
            .map(|preload| preload.field)
            .collect();

        if separate.is_empty() {
            return Ok(parents);
        }

        if concurrent {
            self.preload_concurrent(parents, &separate).await
        } else {
            self.preload_sequential(conn, parents, &separate).await
        }
    }

    /// Entities matching `query` with joined preloads folded in. Separate
    /// preloads are left unresolved.
    pub(crate) async fn load(
        &self,
        conn: &mut dyn Connection,
        query: &Query,
    ) -> Result<Vec<ValueRecord>> {
        if !query.projection.is_empty() {
            return Err(Error::invalid_statement(
                "a projected query returns rows, not entities",
            ));
        }

        let rows = self
            .rows(conn, query)
            .await?
            .into_iter()
            .map(|row| match row {
                Value::Record(record) => Ok(record),
                _ => Err(Error::invalid_statement("adapter returned a non-record row")),
            })
            .collect::<Result<Vec<_>>>()?;

        fold::fold(&self.schema, query, rows)
    }

    /// Loads one entity by primary key.
    pub(crate) async fn get(
        &self,
        conn: &mut dyn Connection,
        query: Query,
        key: &Value,
    ) -> Result<ValueRecord> {
        let model = self.schema.model(query.source);
        let query = query.filter(weft_core::stmt::Expr::eq(model.primary_key, key.clone()));

        self.read(conn, &query, false)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::record_not_found(format!("model={} key={key}", model.name)))
    }

    /// Deletes one entity. Dependents are handled by the adapter according to
    /// their delete policy.
    pub(crate) async fn delete(
        &self,
        conn: &mut dyn Connection,
        model: weft_core::schema::ModelId,
        key: Value,
    ) -> Result<u64> {
        tracing::debug!(model = %self.schema.model(model).name, %key, "delete");

        let response = conn
            .exec(&self.schema, Write::delete(model, key).into())
            .await?;
        Ok(response.rows.into_count())
    }
}
