use crate::{error::ErrorKind, Error};

#[derive(Debug)]
pub(super) struct TransactionCancelled;

impl Error {
    pub fn transaction_cancelled() -> Error {
        ErrorKind::TransactionCancelled(TransactionCancelled).into()
    }

    pub fn is_transaction_cancelled(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransactionCancelled(_))
    }
}

impl std::error::Error for TransactionCancelled {}

impl core::fmt::Display for TransactionCancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("transaction cancelled")
    }
}
