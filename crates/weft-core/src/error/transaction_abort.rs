use super::Error;

/// Marks the plan step that failed. The step's own error is the cause.
#[derive(Debug)]
pub(super) struct TransactionAbort {
    step: Box<str>,
}

impl std::error::Error for TransactionAbort {}

impl core::fmt::Display for TransactionAbort {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "transaction aborted at step `{}`", self.step)
    }
}

impl Error {
    /// Creates the context error used to wrap a failed step's error.
    ///
    /// ```ignore
    /// step_err.context(Error::transaction_abort("insert_user"))
    /// ```
    pub fn transaction_abort(step: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::TransactionAbort(TransactionAbort {
            step: step.into().into(),
        }))
    }

    /// Returns `true` if this error aborted a transaction plan.
    pub fn is_transaction_abort(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::TransactionAbort(_))
    }

    /// Name of the step that aborted the plan.
    pub fn abort_step(&self) -> Option<&str> {
        match self.kind() {
            super::ErrorKind::TransactionAbort(abort) => Some(&abort.step),
            _ => None,
        }
    }
}
