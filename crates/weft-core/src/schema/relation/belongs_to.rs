use crate::schema::{FieldId, ForeignKey, Model, ModelId, Schema};

#[derive(Debug, Clone)]
pub struct BelongsTo {
    /// Model that owns the relation
    pub target: ModelId,

    /// The `HasMany` or `HasOne` association that pairs with this
    pub pair: Option<FieldId>,

    /// `source` is a field on this model, `target` the referenced key.
    pub foreign_key: ForeignKey,

    /// Fields on the target matched during nested casting
    pub identity: Vec<FieldId>,
}

impl BelongsTo {
    pub fn target<'a>(&self, schema: &'a Schema) -> &'a Model {
        schema.model(self.target)
    }
}
