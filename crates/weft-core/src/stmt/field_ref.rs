use super::JoinOn;
use crate::schema::{Field, FieldId};

/// Reference to a field of the query source or of a joined model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub field: FieldId,

    /// The join the field is reached through. `None` for fields on the query
    /// source.
    pub via: Option<JoinOn>,
}

impl FieldRef {
    /// A field reached through the join described by `on`.
    pub fn joined(field: impl Into<FieldId>, on: JoinOn) -> FieldRef {
        FieldRef {
            field: field.into(),
            via: Some(on),
        }
    }
}

impl From<FieldId> for FieldRef {
    fn from(field: FieldId) -> Self {
        FieldRef { field, via: None }
    }
}

impl From<&Field> for FieldRef {
    fn from(field: &Field) -> Self {
        field.id.into()
    }
}
