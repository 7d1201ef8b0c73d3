use super::{BelongsTo, Cardinality, ForeignKey, HasMany, HasOne, ModelId, OnDelete, OwningSide};
use crate::stmt::{self, JoinOn};

use std::fmt;

#[derive(Debug, Clone)]
pub struct Field {
    /// Uniquely identifies the field within the containing model.
    pub id: FieldId,

    /// The field name
    pub name: String,

    /// Primitive or association
    pub ty: FieldTy,

    /// True if a value must be present for the entity to be valid.
    pub required: bool,

    /// True if the field is the primary key
    pub primary_key: bool,

    /// Specified if and how the storage adapter populates this field for new records
    pub auto: Option<Auto>,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub model: ModelId,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct FieldPrimitive {
    /// The field's value type
    pub ty: stmt::Type,
}

#[derive(Debug, Clone)]
pub enum FieldTy {
    Primitive(FieldPrimitive),
    BelongsTo(BelongsTo),
    HasMany(HasMany),
    HasOne(HasOne),
}

/// How the storage adapter should populate the field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auto {
    /// Monotonic integer assigned on insert
    Increment,

    /// Random v4 UUID assigned on insert
    Uuid,
}

impl Field {
    pub fn is_primitive(&self) -> bool {
        matches!(self.ty, FieldTy::Primitive(_))
    }

    pub fn is_relation(&self) -> bool {
        !self.is_primitive()
    }

    /// The value type of a primitive field
    pub fn primitive_ty(&self) -> Option<stmt::Type> {
        match &self.ty {
            FieldTy::Primitive(primitive) => Some(primitive.ty),
            _ => None,
        }
    }

    /// If the field is a relation, return the relation's target ModelId.
    pub fn relation_target_id(&self) -> Option<ModelId> {
        match &self.ty {
            FieldTy::Primitive(_) => None,
            FieldTy::BelongsTo(belongs_to) => Some(belongs_to.target),
            FieldTy::HasMany(has_many) => Some(has_many.target),
            FieldTy::HasOne(has_one) => Some(has_one.target),
        }
    }

    pub fn cardinality(&self) -> Option<Cardinality> {
        match &self.ty {
            FieldTy::Primitive(_) => None,
            FieldTy::HasMany(_) => Some(Cardinality::Many),
            FieldTy::BelongsTo(_) | FieldTy::HasOne(_) => Some(Cardinality::One),
        }
    }

    pub fn owning_side(&self) -> Option<OwningSide> {
        match &self.ty {
            FieldTy::Primitive(_) => None,
            FieldTy::BelongsTo(_) => Some(OwningSide::ThisHasFk),
            FieldTy::HasMany(_) | FieldTy::HasOne(_) => Some(OwningSide::OtherHasFk),
        }
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        match &self.ty {
            FieldTy::Primitive(_) => None,
            FieldTy::BelongsTo(belongs_to) => Some(&belongs_to.foreign_key),
            FieldTy::HasMany(has_many) => Some(&has_many.foreign_key),
            FieldTy::HasOne(has_one) => Some(&has_one.foreign_key),
        }
    }

    /// The delete policy for dependents. `belongs_to` associations never
    /// carry one.
    pub fn on_delete(&self) -> Option<&OnDelete> {
        match &self.ty {
            FieldTy::HasMany(has_many) => Some(&has_many.on_delete),
            FieldTy::HasOne(has_one) => Some(&has_one.on_delete),
            _ => None,
        }
    }

    /// Fields on the target used to match incoming children with persisted
    /// ones during nested casting.
    pub fn identity(&self) -> &[FieldId] {
        match &self.ty {
            FieldTy::Primitive(_) => &[],
            FieldTy::BelongsTo(belongs_to) => &belongs_to.identity,
            FieldTy::HasMany(has_many) => &has_many.identity,
            FieldTy::HasOne(has_one) => &has_one.identity,
        }
    }

    pub fn delete_missing(&self) -> bool {
        match &self.ty {
            FieldTy::HasMany(has_many) => has_many.delete_missing,
            FieldTy::HasOne(has_one) => has_one.delete_missing,
            _ => false,
        }
    }

    /// Field on the target that records a child's position when attached.
    pub fn position(&self) -> Option<FieldId> {
        match &self.ty {
            FieldTy::HasMany(has_many) => has_many.position,
            _ => None,
        }
    }

    /// The join condition between this field's model and the association's
    /// target, expressed from this field's model.
    pub fn join_on(&self) -> Option<JoinOn> {
        let fk = self.foreign_key()?;
        Some(match self.owning_side()? {
            OwningSide::ThisHasFk => JoinOn {
                source: fk.source,
                target: fk.target,
            },
            OwningSide::OtherHasFk => JoinOn {
                source: fk.target,
                target: fk.source,
            },
        })
    }

    pub fn as_belongs_to(&self) -> Option<&BelongsTo> {
        match &self.ty {
            FieldTy::BelongsTo(belongs_to) => Some(belongs_to),
            _ => None,
        }
    }

    pub fn as_has_many(&self) -> Option<&HasMany> {
        match &self.ty {
            FieldTy::HasMany(has_many) => Some(has_many),
            _ => None,
        }
    }

    pub fn as_has_one(&self) -> Option<&HasOne> {
        match &self.ty {
            FieldTy::HasOne(has_one) => Some(has_one),
            _ => None,
        }
    }
}

impl From<&Field> for FieldId {
    fn from(value: &Field) -> Self {
        value.id
    }
}

impl From<&FieldId> for FieldId {
    fn from(value: &FieldId) -> Self {
        *value
    }
}

impl fmt::Debug for FieldId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "FieldId({}/{})", self.model.0, self.index)
    }
}
