use crate::schema::{FieldId, ForeignKey, Model, ModelId, OnDelete, Schema};

#[derive(Debug, Clone)]
pub struct HasMany {
    /// Associated model
    pub target: ModelId,

    /// The `BelongsTo` association that pairs with this, if the target
    /// declares one
    pub pair: Option<FieldId>,

    /// `source` is the foreign key field on the target, `target` the key on
    /// this model.
    pub foreign_key: ForeignKey,

    /// Applied to the children when the parent is deleted
    pub on_delete: OnDelete,

    /// Fields on the target matched during nested casting
    pub identity: Vec<FieldId>,

    /// Nested casting deletes persisted children missing from the input
    pub delete_missing: bool,

    /// Field on the target recording the child's position on attach
    pub position: Option<FieldId>,
}

impl HasMany {
    pub fn target<'a>(&self, schema: &'a Schema) -> &'a Model {
        schema.model(self.target)
    }
}
