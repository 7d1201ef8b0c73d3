use crate::schema::{FieldId, ModelId};

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Model being joined
    pub target: ModelId,

    pub on: JoinOn,

    pub kind: JoinKind,
}

/// Equality join condition `source = target`, where `source` is a field of
/// the query source and `target` a field of the joined model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinOn {
    pub source: FieldId,
    pub target: FieldId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinKind {
    #[default]
    Inner,

    /// Keep source rows without a match, padding the target with nulls
    Left,
}

impl Join {
    /// Joins are considered identical when they reach the same target
    /// through the same condition, regardless of kind.
    pub fn is_same(&self, other: &Join) -> bool {
        self.target == other.target && self.on == other.on
    }
}
