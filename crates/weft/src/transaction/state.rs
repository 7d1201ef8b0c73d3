use super::Results;

use weft_core::{Error, Result};

/// How a plan ended.
#[derive(Debug)]
pub enum TerminalState {
    /// Every step succeeded and the transaction committed
    Committed(Results),

    /// Nothing the plan wrote is visible
    Aborted(Aborted),
}

#[derive(Debug)]
pub struct Aborted {
    /// The step that failed. `None` when the plan failed outside any step:
    /// rejected before starting, cancelled before it began, or failed to
    /// begin or commit.
    pub step: Option<String>,

    pub error: Error,

    /// Results of the steps that ran before the failure. These were rolled
    /// back and are only useful for diagnostics.
    pub partial: Results,
}

impl TerminalState {
    pub(crate) fn aborted(step: Option<String>, error: Error, partial: Results) -> TerminalState {
        TerminalState::Aborted(Aborted {
            step,
            error,
            partial,
        })
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, TerminalState::Committed(_))
    }

    /// Committed results. Never returns the partial results of an aborted
    /// plan.
    pub fn results(&self) -> Option<&Results> {
        match self {
            TerminalState::Committed(results) => Some(results),
            TerminalState::Aborted(_) => None,
        }
    }

    pub fn aborted_state(&self) -> Option<&Aborted> {
        match self {
            TerminalState::Aborted(aborted) => Some(aborted),
            TerminalState::Committed(_) => None,
        }
    }

    /// Converts the state into a `Result`. A step failure is wrapped in a
    /// `TransactionAbort` naming the step.
    pub fn into_result(self) -> Result<Results> {
        match self {
            TerminalState::Committed(results) => Ok(results),
            TerminalState::Aborted(Aborted {
                step: Some(step),
                error,
                ..
            }) => Err(error.context(Error::transaction_abort(step))),
            TerminalState::Aborted(Aborted { error, .. }) => Err(error),
        }
    }
}
