use serde::Serialize;
use std::fmt;

/// An error attached to one field of a changeset. These are data, surfaced
/// to the caller; they only turn into a thrown error when an invalid
/// changeset is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldError {
    /// Input could not be coerced to the field's type
    Cast { reason: String },

    /// A business rule failed
    Validation { message: String },
}

impl FieldError {
    pub fn cast(reason: impl Into<String>) -> FieldError {
        FieldError::Cast {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> FieldError {
        FieldError::Validation {
            message: message.into(),
        }
    }

    pub fn is_cast(&self) -> bool {
        matches!(self, FieldError::Cast { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, FieldError::Validation { .. })
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Cast { reason } => write!(f, "is invalid ({reason})"),
            FieldError::Validation { message } => f.write_str(message),
        }
    }
}
