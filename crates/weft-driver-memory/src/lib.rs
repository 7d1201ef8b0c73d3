//! In-memory storage adapter.
//!
//! All connections opened from one [`Memory`] share a single store. A
//! transaction works on a private copy of the store that replaces the shared
//! one on commit, so uncommitted writes are never visible to other
//! connections. Concurrent transactions do not detect conflicts: the last one
//! to commit wins.

mod read;

mod store;
use store::Store;

use std::sync::{Arc, Mutex};
use url::Url;
use weft_core::{
    async_trait,
    driver::{Cascade, Operation, Response, Transaction, Write, WriteMode},
    err, Error, Result, Schema,
};

#[derive(Debug, Clone, Default)]
pub struct Memory {
    store: Arc<Mutex<Store>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver from a `memory:` URL. The rest of the URL is ignored;
    /// every call returns an empty store.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(Error::driver)?;

        if url.scheme() != "memory" {
            return Err(err!(
                "connection URL does not have a `memory` scheme; url={url}"
            ));
        }

        Ok(Self::new())
    }
}

#[async_trait]
impl weft_core::Driver for Memory {
    async fn connect(&self) -> Result<Box<dyn weft_core::Connection>> {
        Ok(Box::new(Connection {
            shared: self.store.clone(),
            transaction: None,
        }))
    }
}

#[derive(Debug)]
pub struct Connection {
    shared: Arc<Mutex<Store>>,

    /// Private copy of the store while a transaction is open
    transaction: Option<Store>,
}

impl Connection {
    fn with_store<R>(&mut self, f: impl FnOnce(&mut Store) -> Result<R>) -> Result<R> {
        match &mut self.transaction {
            Some(store) => f(store),
            None => {
                let mut store = self
                    .shared
                    .lock()
                    .map_err(|_| err!("memory store lock poisoned"))?;
                f(&mut store)
            }
        }
    }

    fn transaction(&mut self, op: Transaction) -> Result<Response> {
        match op {
            Transaction::Start => {
                if self.transaction.is_some() {
                    return Err(err!("transaction already open on this connection"));
                }
                let snapshot = self
                    .shared
                    .lock()
                    .map_err(|_| err!("memory store lock poisoned"))?
                    .clone();
                self.transaction = Some(snapshot);
            }
            Transaction::Commit => {
                let Some(store) = self.transaction.take() else {
                    return Err(err!("commit without an open transaction"));
                };
                *self
                    .shared
                    .lock()
                    .map_err(|_| err!("memory store lock poisoned"))? = store;
            }
            Transaction::Rollback => {
                if self.transaction.take().is_none() {
                    return Err(err!("rollback without an open transaction"));
                }
            }
        }

        Ok(Response::count(0))
    }
}

#[async_trait]
impl weft_core::Connection for Connection {
    async fn exec(&mut self, schema: &Arc<Schema>, op: Operation) -> Result<Response> {
        tracing::trace!(?op, "memory exec");

        match op {
            Operation::Read(query) => {
                let rows = self.with_store(|store| read::exec(store, schema, &query))?;
                Ok(Response::values(rows))
            }
            Operation::Write(Write { model, mode }) => self.with_store(|store| match mode {
                WriteMode::Insert(record) => store.insert(schema, model, record).map(Response::record),
                WriteMode::Update { key, changes } => store
                    .update(schema, model, &key, changes)
                    .map(Response::record),
                WriteMode::Delete { key } => store.delete(schema, model, &key).map(Response::count),
            }),
            Operation::Cascade(Cascade { relation, parent }) => {
                self.with_store(|store| store.cascade(schema, relation, &parent).map(Response::count))
            }
            Operation::Transaction(op) => self.transaction(op),
        }
    }
}
