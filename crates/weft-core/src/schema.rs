//! Entity registry: static descriptions of models, their fields and the
//! associations between them.
//!
//! A [`Schema`] is built once with [`Schema::builder`] and shared behind an
//! `Arc` for the lifetime of the process. Everything in it is plain data;
//! behavior that depends on it lives in the engine and the drivers.

mod builder;
pub use builder::{Builder, ModelDef, RelationDef};

mod field;
pub use field::{Auto, Field, FieldId, FieldPrimitive, FieldTy};

mod fk;
pub use fk::ForeignKey;

mod model;
pub use model::{Model, ModelId};

mod on_delete;
pub use on_delete::OnDelete;

mod relation;
pub use relation::{BelongsTo, Cardinality, HasMany, HasOne, OwningSide};

mod verify;

use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct Schema {
    pub models: IndexMap<ModelId, Model>,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Get a model by ID
    pub fn model(&self, id: impl Into<ModelId>) -> &Model {
        self.models.get(&id.into()).expect("invalid model ID")
    }

    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.models.values().find(|model| model.name == name)
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    /// Get a field by ID
    pub fn field(&self, id: FieldId) -> &Field {
        self.model(id.model)
            .fields
            .get(id.index)
            .expect("invalid field ID")
    }

    /// Returns the `model.field` name used in error messages and query text.
    pub fn qualified_name(&self, id: FieldId) -> String {
        format!("{}.{}", self.model(id.model).name, self.field(id).name)
    }
}
