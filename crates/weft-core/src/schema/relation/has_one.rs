use crate::schema::{FieldId, ForeignKey, Model, ModelId, OnDelete, Schema};

#[derive(Debug, Clone)]
pub struct HasOne {
    /// Associated model
    pub target: ModelId,

    /// The `BelongsTo` association that pairs with this
    pub pair: Option<FieldId>,

    /// `source` is the foreign key field on the target, `target` the key on
    /// this model.
    pub foreign_key: ForeignKey,

    pub on_delete: OnDelete,

    pub identity: Vec<FieldId>,

    pub delete_missing: bool,
}

impl HasOne {
    pub fn target<'a>(&self, schema: &'a Schema) -> &'a Model {
        schema.model(self.target)
    }
}
