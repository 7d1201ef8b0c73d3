use super::Error;

/// Error raised while binding children to a parent through an association.
#[derive(Debug)]
pub(super) struct AssociationError {
    kind: AssociationErrorKind,
    association: Box<str>,
}

/// The ways an association assignment can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationErrorKind {
    /// The parent is invalid or was never persisted, so there is no key to
    /// hand to the children.
    MissingRequiredParent,

    /// The entity handed to `attach` does not belong to the association's
    /// target model.
    AttachTargetInvalid,

    /// Nested casting needs the persisted children, but the association was
    /// not preloaded on the parent.
    NotLoaded,

    /// More than one child was given for a one-cardinality association.
    TooManyChildren,
}

impl AssociationErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            AssociationErrorKind::MissingRequiredParent => "missing required parent",
            AssociationErrorKind::AttachTargetInvalid => "attach target invalid",
            AssociationErrorKind::NotLoaded => "association not loaded",
            AssociationErrorKind::TooManyChildren => "too many children for a one association",
        }
    }
}

impl std::error::Error for AssociationError {}

impl core::fmt::Display for AssociationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "association `{}`: {}",
            self.association,
            self.kind.as_str()
        )
    }
}

impl Error {
    /// Creates an association error of the given kind.
    pub fn association(kind: AssociationErrorKind, association: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Association(AssociationError {
            kind,
            association: association.into().into(),
        }))
    }

    pub fn missing_required_parent(association: impl Into<String>) -> Error {
        Error::association(AssociationErrorKind::MissingRequiredParent, association)
    }

    /// Returns the association error kind, if this is an association error.
    pub fn association_kind(&self) -> Option<AssociationErrorKind> {
        match self.kind() {
            super::ErrorKind::Association(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Returns `true` if this error is an association error.
    pub fn is_association(&self) -> bool {
        self.association_kind().is_some()
    }

    /// Returns `true` if this error reports a missing or unpersisted parent.
    pub fn is_missing_required_parent(&self) -> bool {
        self.association_kind() == Some(AssociationErrorKind::MissingRequiredParent)
    }
}
