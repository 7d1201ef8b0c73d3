use super::{Field, FieldId, FieldTy};
use crate::stmt::{Value, ValueRecord};

use std::fmt;

#[derive(Debug, Clone)]
pub struct Model {
    /// Uniquely identifies the model within the schema
    pub id: ModelId,

    /// Name of the model
    pub name: String,

    /// Fields contained by the model, primitives and associations, in
    /// declaration order.
    pub fields: Vec<Field>,

    /// The model's primary key field
    pub primary_key: FieldId,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

impl Model {
    pub fn field(&self, field: impl Into<FieldId>) -> &Field {
        let field_id = field.into();
        assert_eq!(self.id, field_id.model);
        &self.fields[field_id.index]
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn primary_key_field(&self) -> &Field {
        self.field(self.primary_key)
    }

    /// Primitive (storable) fields
    pub fn primitives(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().filter(|field| field.is_primitive())
    }

    /// Association fields
    pub fn relations(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().filter(|field| field.is_relation())
    }

    /// Associations whose foreign key lives on the other model. These are the
    /// associations a delete policy applies to.
    pub fn dependents(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields
            .iter()
            .filter(|field| matches!(field.ty, FieldTy::HasMany(_) | FieldTy::HasOne(_)))
    }

    /// A record with every slot set to `Null`, used as the base of a new entity.
    pub fn blank_record(&self) -> ValueRecord {
        ValueRecord::from_vec(vec![Value::Null; self.fields.len()])
    }

    /// Reads the primary key out of a record of this model.
    pub fn key_of<'a>(&self, record: &'a ValueRecord) -> &'a Value {
        &record[self.primary_key.index]
    }

    /// Copy of `record` with every association slot reset to `Null`. This is
    /// the shape storage adapters persist.
    pub fn strip_relations(&self, record: &ValueRecord) -> ValueRecord {
        let mut stripped = record.clone();
        for field in self.relations() {
            stripped[field.id.index] = Value::Null;
        }
        stripped
    }
}

impl ModelId {
    /// Create a `FieldId` representing the current model's field at index
    /// `index`.
    pub const fn field(self, index: usize) -> FieldId {
        FieldId { model: self, index }
    }
}

impl From<&Self> for ModelId {
    fn from(src: &Self) -> Self {
        *src
    }
}

impl From<&Model> for ModelId {
    fn from(value: &Model) -> Self {
        value.id
    }
}

impl fmt::Debug for ModelId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "ModelId({})", self.0)
    }
}
