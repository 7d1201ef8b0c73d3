use super::Error;

/// Error when an invalid changeset is submitted for writing.
///
/// Cast and validation errors stay on the changeset as data; this error only
/// exists so a transaction step can abort with a summary of them.
#[derive(Debug)]
pub(super) struct InvalidChangesetError {
    model: Box<str>,
    summary: Box<str>,
}

impl std::error::Error for InvalidChangesetError {}

impl core::fmt::Display for InvalidChangesetError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "invalid changeset for `{}`: {}",
            self.model, self.summary
        )
    }
}

impl Error {
    pub fn invalid_changeset(model: impl Into<String>, summary: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidChangeset(InvalidChangesetError {
            model: model.into().into(),
            summary: summary.into().into(),
        }))
    }

    /// Returns `true` if this error reports an invalid changeset.
    pub fn is_invalid_changeset(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::InvalidChangeset(_))
    }
}
