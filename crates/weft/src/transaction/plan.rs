use super::Results;
use crate::changeset::Changeset;

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use weft_core::{
    schema::{Field, FieldId, ModelId},
    stmt::{Query, Value, ValueRecord},
    Result,
};

type StepFn = Box<dyn FnOnce(&Results) -> Result<Action> + Send>;

/// An ordered list of named steps committed as a unit.
///
/// ```ignore
/// let plan = Plan::new()
///     .insert("user", user)
///     .insert_with("todo", |results| {
///         let user = results.record("user").unwrap();
///         Ok(weft::Changeset::new(&schema, todo).put_change("user_id", user[0].clone()))
///     });
/// ```
#[derive(Default)]
pub struct Plan {
    pub(super) steps: Vec<Step>,
    pub(super) cancel: CancelHandle,
}

pub(super) struct Step {
    pub(super) name: String,
    pub(super) run: StepFn,
}

/// What a step does once its inputs are known.
#[derive(Debug)]
pub enum Action {
    /// Submit a changeset (insert, update or delete, with its nested
    /// changesets). Produces the stored record, or `Null` for a delete.
    Persist(Changeset),

    /// Delete one entity by key. Produces the number of deleted records.
    Delete { model: ModelId, key: Value },

    /// Read through the transaction. Produces a list of records.
    Read(Query),

    /// Load one entity by key. Produces the record.
    Get { query: Query, key: Value },

    /// Produce a value without touching storage
    Value(Value),

    /// Attach `entities` to the record produced by the step `parent`.
    /// Produces the parent record with the association slot filled.
    Attach {
        parent: String,
        relation: FieldId,
        entities: Vec<ValueRecord>,
    },
}

/// Cancels a plan. Cancelling before the plan starts means it never begins;
/// cancelling while it runs aborts it before the next step.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Plan {
    pub fn new() -> Plan {
        Plan::default()
    }

    /// Adds a step computing its action from the results of earlier steps.
    pub fn step(
        mut self,
        name: impl Into<String>,
        f: impl FnOnce(&Results) -> Result<Action> + Send + 'static,
    ) -> Plan {
        self.steps.push(Step {
            name: name.into(),
            run: Box::new(f),
        });
        self
    }

    pub fn insert(self, name: impl Into<String>, changeset: Changeset) -> Plan {
        self.step(name, move |_| Ok(Action::Persist(changeset)))
    }

    pub fn insert_with(
        self,
        name: impl Into<String>,
        f: impl FnOnce(&Results) -> Result<Changeset> + Send + 'static,
    ) -> Plan {
        self.step(name, move |results| f(results).map(Action::Persist))
    }

    /// Same as [`insert`](Self::insert); the changeset decides whether it
    /// inserts or updates.
    pub fn update(self, name: impl Into<String>, changeset: Changeset) -> Plan {
        self.insert(name, changeset)
    }

    pub fn update_with(
        self,
        name: impl Into<String>,
        f: impl FnOnce(&Results) -> Result<Changeset> + Send + 'static,
    ) -> Plan {
        self.insert_with(name, f)
    }

    pub fn delete(self, name: impl Into<String>, model: impl Into<ModelId>, key: impl Into<Value>) -> Plan {
        let model = model.into();
        let key = key.into();
        self.step(name, move |_| Ok(Action::Delete { model, key }))
    }

    pub fn delete_with(
        self,
        name: impl Into<String>,
        f: impl FnOnce(&Results) -> Result<(ModelId, Value)> + Send + 'static,
    ) -> Plan {
        self.step(name, move |results| {
            let (model, key) = f(results)?;
            Ok(Action::Delete { model, key })
        })
    }

    pub fn read(self, name: impl Into<String>, query: Query) -> Plan {
        self.step(name, move |_| Ok(Action::Read(query)))
    }

    pub fn read_with(
        self,
        name: impl Into<String>,
        f: impl FnOnce(&Results) -> Result<Query> + Send + 'static,
    ) -> Plan {
        self.step(name, move |results| f(results).map(Action::Read))
    }

    pub fn get(self, name: impl Into<String>, query: Query, key: impl Into<Value>) -> Plan {
        let key = key.into();
        self.step(name, move |_| Ok(Action::Get { query, key }))
    }

    pub fn value(self, name: impl Into<String>, value: impl Into<Value>) -> Plan {
        let value = value.into();
        self.step(name, move |_| Ok(Action::Value(value)))
    }

    pub fn value_with(
        self,
        name: impl Into<String>,
        f: impl FnOnce(&Results) -> Result<Value> + Send + 'static,
    ) -> Plan {
        self.step(name, move |results| f(results).map(Action::Value))
    }

    /// Attaches pre-existing `entities` through `relation` to the record the
    /// step `parent` produced. A missing parent step fails the plan with a
    /// missing-required-parent association error.
    pub fn attach(
        self,
        name: impl Into<String>,
        parent: impl Into<String>,
        relation: &Field,
        entities: Vec<ValueRecord>,
    ) -> Plan {
        let parent = parent.into();
        let relation = relation.id;
        self.step(name, move |_| {
            Ok(Action::Attach {
                parent,
                relation,
                entities,
            })
        })
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.steps.iter().map(|step| step.name.as_str())
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("steps", &self.step_names().collect::<Vec<_>>())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
