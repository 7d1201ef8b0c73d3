use super::FieldId;

/// What happens to dependents when their parent is deleted.
///
/// `None` is the default to stay compatible with schemas that never declare
/// a policy. It leaves children holding a foreign key to a parent that no
/// longer exists; the schema builder logs a warning for every association
/// that relies on it implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OnDelete {
    /// Leave dependents untouched.
    #[default]
    None,

    /// Delete dependents, recursing through their own cascade associations.
    Cascade,

    /// Set the listed columns on every dependent to `Null`.
    Nullify(Vec<FieldId>),

    /// Refuse to delete a parent that still has dependents.
    Restrict,
}

impl OnDelete {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnDelete::None => "none",
            OnDelete::Cascade => "cascade",
            OnDelete::Nullify(_) => "nullify",
            OnDelete::Restrict => "restrict",
        }
    }
}
