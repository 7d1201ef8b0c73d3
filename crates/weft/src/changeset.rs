//! Staged, validated changes to one entity instance.
//!
//! A [`Changeset`] never touches the entity it wraps. Casting and validation
//! are pure `Changeset -> Changeset` steps; the proposed values only reach
//! storage when the changeset is submitted and the surrounding transaction
//! commits.

mod cast;
pub(crate) use cast::cast_value;

mod field_error;
pub use field_error::FieldError;

mod validate;
pub use validate::{validate, Input, Pipeline};

use indexmap::{IndexMap, IndexSet};
use std::{fmt, sync::Arc};
use weft_core::{
    schema::{Field, Model, ModelId},
    stmt::{Value, ValueRecord},
    Schema,
};

/// What submitting the changeset does to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update,
    Delete,
}

#[derive(Clone)]
pub struct Changeset {
    schema: Arc<Schema>,

    model: ModelId,

    /// The entity the changes apply to: a persisted record or a blank one
    data: ValueRecord,

    action: Action,

    /// Proposed values, by field index, in the order they were made
    changes: IndexMap<usize, Value>,

    /// Errors by field name
    errors: IndexMap<String, Vec<FieldError>>,

    /// Child changesets by association name
    nested: IndexMap<String, Vec<Changeset>>,

    /// Foreign key fields whose value is only known once the other side of
    /// the association has been written
    deferred: IndexSet<usize>,

    /// Ordering recorded by `attach`
    position: Option<usize>,
}

impl Changeset {
    /// A changeset inserting a new entity of `model`.
    pub fn new(schema: &Arc<Schema>, model: impl Into<ModelId>) -> Changeset {
        let model = schema.model(model);

        Changeset {
            schema: schema.clone(),
            model: model.id,
            data: model.blank_record(),
            action: Action::Insert,
            changes: IndexMap::new(),
            errors: IndexMap::new(),
            nested: IndexMap::new(),
            deferred: IndexSet::new(),
            position: None,
        }
    }

    /// A changeset updating the persisted entity `data`.
    ///
    /// A record whose width does not match the model is not wrapped; the
    /// changeset keeps a blank record and carries a cast error on `base`.
    pub fn for_entity(
        schema: &Arc<Schema>,
        model: impl Into<ModelId>,
        data: ValueRecord,
    ) -> Changeset {
        let mut changeset = Changeset::new(schema, model);
        changeset.action = Action::Update;

        let expected = changeset.model().fields.len();
        if data.len() != expected {
            let reason = format!("record has {} values, expected {expected}", data.len());
            return changeset.add_error("base", FieldError::cast(reason));
        }

        changeset.data = data;
        changeset
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn model(&self) -> &Model {
        self.schema.model(self.model)
    }

    pub fn model_id(&self) -> ModelId {
        self.model
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// The wrapped entity, without the proposed changes
    pub fn data(&self) -> &ValueRecord {
        &self.data
    }

    /// True when the wrapped entity already exists in storage.
    pub fn is_persisted(&self) -> bool {
        self.action != Action::Insert
    }

    /// Valid when there are no errors on this changeset or any nested one.
    /// Computed on every call.
    pub fn is_valid(&self) -> bool {
        self.errors.values().all(Vec::is_empty)
            && self
                .nested
                .values()
                .flatten()
                .all(Changeset::is_valid)
    }

    pub fn errors(&self) -> &IndexMap<String, Vec<FieldError>> {
        &self.errors
    }

    pub fn errors_on(&self, field: &str) -> &[FieldError] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn has_cast_error(&self, field: &str) -> bool {
        self.errors_on(field).iter().any(FieldError::is_cast)
    }

    /// The proposed value for `field`, if one was staged.
    pub fn get_change(&self, field: &str) -> Option<&Value> {
        let field = self.field(field)?;
        self.changes.get(&field.id.index)
    }

    /// The value `field` will have once the changeset is applied.
    pub fn get_field(&self, field: &str) -> Option<&Value> {
        let field = self.field(field)?;
        Some(self.value_at(field.id.index))
    }

    pub(crate) fn value_at(&self, index: usize) -> &Value {
        self.changes.get(&index).unwrap_or(&self.data[index])
    }

    /// Staged changes by field name
    pub fn changes(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        let model = self.model();
        self.changes
            .iter()
            .map(move |(index, value)| (model.fields[*index].name.as_str(), value))
    }

    pub(crate) fn change_list(&self) -> Vec<(usize, Value)> {
        self.changes
            .iter()
            .map(|(index, value)| (*index, value.clone()))
            .collect()
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Child changesets staged for the association `name`
    pub fn nested(&self, name: &str) -> &[Changeset] {
        self.nested.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every association with staged child changesets
    pub fn associations(&self) -> impl Iterator<Item = (&str, &[Changeset])> + '_ {
        self.nested
            .iter()
            .map(|(name, children)| (name.as_str(), children.as_slice()))
    }

    pub(crate) fn nested_all(&self) -> &IndexMap<String, Vec<Changeset>> {
        &self.nested
    }

    /// The ordering position recorded when the entity was attached
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// True when `field` waits for a key from the other side of an
    /// association.
    pub fn is_deferred(&self, field: &str) -> bool {
        self.field(field)
            .is_some_and(|field| self.deferred.contains(&field.id.index))
    }

    pub(crate) fn deferred(&self) -> &IndexSet<usize> {
        &self.deferred
    }

    /// Stages `value` for `field` without coercion. The value must already
    /// have the field's type; a mismatch is recorded as a cast error.
    pub fn put_change(self, field: &str, value: impl Into<Value>) -> Changeset {
        let value = value.into();

        let Some(target) = self.field(field) else {
            return self.add_error(field, FieldError::cast("unknown field"));
        };

        let Some(ty) = target.primitive_ty() else {
            return self.add_error(field, FieldError::cast("is an association"));
        };

        if !ty.accepts(&value) {
            let reason = format!("expected {}", ty.name());
            return self.add_error(field, FieldError::cast(reason));
        }

        let index = target.id.index;
        self.set_change(index, value)
    }

    /// Records a change, dropping it when it matches the current value.
    pub(crate) fn set_change(mut self, index: usize, value: Value) -> Changeset {
        if self.data[index] == value {
            self.changes.shift_remove(&index);
        } else {
            self.changes.insert(index, value);
        }
        self.deferred.shift_remove(&index);
        self
    }

    /// Appends an error to `field`. Identical errors are only kept once.
    pub fn add_error(mut self, field: &str, error: FieldError) -> Changeset {
        let errors = self.errors.entry(field.to_string()).or_default();
        if !errors.contains(&error) {
            errors.push(error);
        }
        self
    }

    /// Turns the changeset into a delete of the wrapped entity.
    pub fn mark_delete(mut self) -> Changeset {
        self.action = Action::Delete;
        self.changes.clear();
        self
    }

    pub(crate) fn defer(mut self, index: usize) -> Changeset {
        self.changes.shift_remove(&index);
        self.deferred.insert(index);
        self
    }

    pub(crate) fn with_position(mut self, position: usize) -> Changeset {
        self.position = Some(position);
        self
    }

    pub(crate) fn put_nested(mut self, name: &str, children: Vec<Changeset>) -> Changeset {
        self.nested.insert(name.to_string(), children);
        self
    }

    /// The wrapped entity with the staged changes applied. Association slots
    /// keep their loaded values.
    pub fn apply(&self) -> ValueRecord {
        let mut record = self.data.clone();
        for (index, value) in &self.changes {
            record[*index] = value.clone();
        }
        record
    }

    pub(crate) fn field(&self, name: &str) -> Option<&Field> {
        self.model().field_by_name(name)
    }

    /// Flattened `path: message` list of every error in the tree, e.g.
    /// `todos[1].title: can't be blank`.
    pub fn error_summary(&self) -> String {
        let mut lines = vec![];
        self.collect_errors("", &mut lines);
        lines.join("; ")
    }

    fn collect_errors(&self, prefix: &str, lines: &mut Vec<String>) {
        for (field, errors) in &self.errors {
            for error in errors {
                lines.push(format!("{prefix}{field}: {error}"));
            }
        }

        for (name, children) in &self.nested {
            for (i, child) in children.iter().enumerate() {
                child.collect_errors(&format!("{prefix}{name}[{i}]."), lines);
            }
        }
    }
}

impl PartialEq for Changeset {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.model == other.model
            && self.data == other.data
            && self.action == other.action
            && self.changes == other.changes
            && self.errors == other.errors
            && self.nested == other.nested
            && self.deferred == other.deferred
            && self.position == other.position
    }
}

impl fmt::Debug for Changeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Changeset")
            .field("model", &self.model().name)
            .field("action", &self.action)
            .field("data", &self.data)
            .field("changes", &self.changes)
            .field("errors", &self.errors)
            .field("nested", &self.nested)
            .field("deferred", &self.deferred)
            .field("position", &self.position)
            .finish()
    }
}
