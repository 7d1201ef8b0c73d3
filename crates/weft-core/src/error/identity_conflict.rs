use super::Error;

/// Error when nested-cast input names the same child identity twice.
#[derive(Debug)]
pub(super) struct IdentityConflictError {
    association: Box<str>,
    identity: Box<str>,
}

impl std::error::Error for IdentityConflictError {}

impl core::fmt::Display for IdentityConflictError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "identity conflict: `{}` received identity {} more than once",
            self.association, self.identity
        )
    }
}

impl Error {
    pub fn identity_conflict(association: impl Into<String>, identity: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::IdentityConflict(IdentityConflictError {
            association: association.into().into(),
            identity: identity.into().into(),
        }))
    }

    /// Returns `true` if this error is an identity conflict.
    pub fn is_identity_conflict(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::IdentityConflict(_))
    }
}
