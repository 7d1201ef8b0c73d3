//! Binding children to a parent changeset.
//!
//! Two disciplines exist and a single assignment uses exactly one of them.
//! [`nested_cast`] treats the children as untrusted input: each one is
//! matched against the persisted children by identity, cast and fully
//! validated. [`attach`] binds entities the caller already trusts: only the
//! foreign key and the ordering position are touched.

use crate::changeset::{cast_value, validate, Changeset, FieldError, Input, Pipeline};

use indexmap::{IndexMap, IndexSet};
use serde_json::Value as Json;
use weft_core::{
    schema::{Cardinality, Field, FieldId, Model, OwningSide},
    stmt::{Value, ValueRecord},
    AssociationErrorKind, Error, Result, Schema,
};

/// How untrusted children are cast by [`nested_cast`].
#[derive(Debug, Clone, Default)]
pub struct NestedCast {
    permitted: Vec<String>,
    pipeline: Pipeline,

    /// Associations of the child that are themselves nested-cast
    nested: Vec<(String, NestedCast)>,
}

impl NestedCast {
    pub fn new<S: AsRef<str>>(permitted: &[S]) -> NestedCast {
        NestedCast {
            permitted: permitted.iter().map(|s| s.as_ref().to_string()).collect(),
            ..NestedCast::default()
        }
    }

    /// Validators run on every child after casting.
    pub fn pipeline(mut self, pipeline: Pipeline) -> NestedCast {
        self.pipeline = pipeline;
        self
    }

    /// Casts the child association `association` from the same input.
    pub fn nest(mut self, association: impl Into<String>, cast: NestedCast) -> NestedCast {
        self.nested.push((association.into(), cast));
        self
    }
}

/// Casts untrusted children of `association` onto `parent`.
///
/// `raw` is a JSON array for many-associations and an object (or a
/// one-element array) for one-associations; `null` means no children.
///
/// Children carrying an identity that matches a loaded child become updates
/// of that child; everything else becomes an insert. Loaded children missing
/// from `raw` are left alone unless the association declares
/// `delete_missing`, in which case they are staged as deletes.
pub fn nested_cast(
    parent: Changeset,
    association: &str,
    raw: &Json,
    cast: &NestedCast,
) -> Result<Changeset> {
    let schema = parent.schema().clone();
    let (field, target) = relation(&schema, &parent, association)?;
    let qualified = schema.qualified_name(field.id);
    let cardinality = field.cardinality();

    let raw_children: Vec<&Json> = match (cardinality, raw) {
        (_, Json::Null) => vec![],
        (Some(Cardinality::Many), Json::Array(items)) => items.iter().collect(),
        (Some(Cardinality::One), Json::Array(items)) if items.len() > 1 => {
            return Err(Error::association(
                AssociationErrorKind::TooManyChildren,
                qualified,
            ));
        }
        (Some(Cardinality::One), Json::Array(items)) => items.iter().collect(),
        (Some(Cardinality::One), Json::Object(_)) => vec![raw],
        (Some(Cardinality::Many), _) => {
            return Ok(parent.add_error(association, FieldError::cast("expected a list")));
        }
        _ => {
            return Ok(parent.add_error(association, FieldError::cast("expected an object")));
        }
    };

    let identity = field.identity();
    let mut loaded = IndexMap::new();
    for record in loaded_children(&parent, field, target, &qualified)? {
        if let Some(key) = record_identity(&record, identity) {
            loaded.insert(key, record);
        }
    }

    let mut parent = parent;
    let mut seen = IndexSet::new();
    let mut children = vec![];

    for raw_child in raw_children {
        let Json::Object(params) = raw_child else {
            parent = parent.add_error(association, FieldError::cast("expected an object"));
            continue;
        };

        let base = match raw_identity(target, identity, params) {
            Some(key) => {
                if !seen.insert(key.clone()) {
                    let identity = Value::List(key).to_string();
                    return Err(Error::identity_conflict(qualified, identity));
                }

                match loaded.get(&key) {
                    Some(record) => Changeset::for_entity(&schema, target.id, record.clone()),
                    None => Changeset::new(&schema, target.id),
                }
            }
            None => Changeset::new(&schema, target.id),
        };

        let base = link_child(&parent, field, base);
        let input = Input::Raw {
            params: raw_child.clone(),
            permitted: cast.permitted.clone(),
        };
        let mut child = validate(base, input, &cast.pipeline);

        for (name, nested) in &cast.nested {
            if let Some(raw) = params.get(name) {
                child = nested_cast(child, name, raw, nested)?;
            }
        }

        if field.owning_side() == Some(OwningSide::ThisHasFk) {
            parent = link_parent(parent, field, &child);
        }

        children.push(child);
    }

    if field.delete_missing() {
        for (key, record) in loaded {
            if !seen.contains(&key) {
                children.push(Changeset::for_entity(&schema, target.id, record).mark_delete());
            }
        }
    }

    Ok(parent.put_nested(association, children))
}

/// Binds already-valid `entities` to `parent` through `association`.
///
/// Entities with a primary key are treated as persisted and staged as
/// updates carrying only the foreign key and position; entities without one
/// are staged as inserts of their values as given. No validator runs.
pub fn attach(parent: Changeset, association: &str, entities: Vec<ValueRecord>) -> Result<Changeset> {
    let schema = parent.schema().clone();
    let (field, target) = relation(&schema, &parent, association)?;
    let qualified = schema.qualified_name(field.id);

    if field.cardinality() == Some(Cardinality::One) && entities.len() > 1 {
        return Err(Error::association(
            AssociationErrorKind::TooManyChildren,
            qualified,
        ));
    }

    if field.owning_side() == Some(OwningSide::OtherHasFk) && !parent.is_valid() {
        return Err(Error::missing_required_parent(qualified));
    }

    let mut parent = parent;
    let mut children = Vec::with_capacity(entities.len());

    for (position, entity) in entities.into_iter().enumerate() {
        if entity.len() != target.fields.len() {
            return Err(Error::association(
                AssociationErrorKind::AttachTargetInvalid,
                qualified,
            ));
        }

        let child = if target.key_of(&entity).is_null() {
            target
                .primitives()
                .fold(Changeset::new(&schema, target.id), |child, f| {
                    match &entity[f.id.index] {
                        Value::Null => child,
                        value => child.set_change(f.id.index, value.clone()),
                    }
                })
        } else {
            Changeset::for_entity(&schema, target.id, entity)
        };

        let mut child = link_child(&parent, field, child).with_position(position);

        if let Some(column) = field.position() {
            child = child.set_change(column.index, Value::I64(position as i64));
        }

        if field.owning_side() == Some(OwningSide::ThisHasFk) {
            parent = link_parent(parent, field, &child);
        }

        children.push(child);
    }

    Ok(parent.put_nested(association, children))
}

fn relation<'a>(
    schema: &'a Schema,
    parent: &Changeset,
    name: &str,
) -> Result<(&'a Field, &'a Model)> {
    let model = schema.model(parent.model_id());

    model
        .field_by_name(name)
        .and_then(|field| Some((field, schema.model(field.relation_target_id()?))))
        .ok_or_else(|| {
            Error::invalid_statement(format!("`{}` has no association `{name}`", model.name))
        })
}

/// Children currently loaded in the parent's association slot.
fn loaded_children(
    parent: &Changeset,
    field: &Field,
    target: &Model,
    qualified: &str,
) -> Result<Vec<ValueRecord>> {
    let loaded: Vec<ValueRecord> = match &parent.data()[field.id.index] {
        Value::List(items) => items
            .iter()
            .filter_map(|item| item.as_record().cloned())
            .collect(),
        Value::Record(record) => vec![record.clone()],
        Value::Null
            if parent.is_persisted() && field.cardinality() == Some(Cardinality::Many) =>
        {
            return Err(Error::association(
                AssociationErrorKind::NotLoaded,
                qualified,
            ));
        }
        _ => vec![],
    };

    if let Some(record) = loaded.iter().find(|record| record.len() != target.fields.len()) {
        return Err(Error::invalid_statement(format!(
            "loaded `{qualified}` record has {} values, expected {}",
            record.len(),
            target.fields.len()
        )));
    }

    Ok(loaded)
}

fn record_identity(record: &ValueRecord, identity: &[FieldId]) -> Option<Vec<Value>> {
    identity
        .iter()
        .map(|id| Some(record[id.index].clone()).filter(|value| !value.is_null()))
        .collect()
}

/// The identity carried by raw input. Missing, null or uncastable parts mean
/// the child has no identity.
fn raw_identity(
    target: &Model,
    identity: &[FieldId],
    params: &serde_json::Map<String, Json>,
) -> Option<Vec<Value>> {
    identity
        .iter()
        .map(|id| {
            let field = target.field(*id);
            let value = cast_value(field.primitive_ty()?, params.get(&field.name)?).ok()?;
            Some(value).filter(|value| !value.is_null())
        })
        .collect()
}

/// Points a child of an other-has-fk association at the parent. The key is
/// deferred when the parent is not persisted yet.
fn link_child(parent: &Changeset, field: &Field, child: Changeset) -> Changeset {
    let Some(fk) = field.foreign_key() else {
        return child;
    };

    if field.owning_side() != Some(OwningSide::OtherHasFk) {
        return child;
    }

    let key = parent.value_at(fk.target.index);
    if parent.is_persisted() && !key.is_null() {
        child.set_change(fk.source.index, key.clone())
    } else {
        child.defer(fk.source.index)
    }
}

/// Points the parent of a this-has-fk association at the child. The key is
/// deferred when the child is not persisted yet.
fn link_parent(parent: Changeset, field: &Field, child: &Changeset) -> Changeset {
    let Some(fk) = field.foreign_key() else {
        return parent;
    };

    let key = child.value_at(fk.target.index);
    if child.is_persisted() && !key.is_null() {
        parent.set_change(fk.source.index, key.clone())
    } else {
        parent.defer(fk.source.index)
    }
}
