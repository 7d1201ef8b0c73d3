use super::Error;

/// Error when a `Restrict` delete policy blocks removing a parent.
#[derive(Debug)]
pub(super) struct ConstraintViolationError {
    association: Box<str>,
    children: usize,
}

impl std::error::Error for ConstraintViolationError {}

impl core::fmt::Display for ConstraintViolationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "constraint violation: `{}` is restricted and still has {} child record(s)",
            self.association, self.children
        )
    }
}

impl Error {
    /// Creates a constraint violation error for the named association.
    pub fn constraint_violation(association: impl Into<String>, children: usize) -> Error {
        Error::from(super::ErrorKind::ConstraintViolation(
            ConstraintViolationError {
                association: association.into().into(),
                children,
            },
        ))
    }

    /// Returns `true` if this error is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::ConstraintViolation(_))
    }
}
