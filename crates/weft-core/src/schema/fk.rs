use super::FieldId;

/// A single-column foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    /// The field acting as the foreign key. For `belongs_to` it lives on the
    /// declaring model, for `has_many`/`has_one` on the target.
    pub source: FieldId,

    /// The key field the foreign key references.
    pub target: FieldId,
}
