use crate::schema::FieldId;

/// Resolve an association alongside its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preload {
    /// The association field on the query source
    pub field: FieldId,

    pub strategy: Strategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One extra read per association, keyed by the parent key set
    Separate,

    /// Left join on the base read; rows are folded afterwards
    Joined,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Separate => "separate",
            Strategy::Joined => "joined",
        }
    }
}
