use crate::DriverOp;

use std::sync::{Arc, Mutex};
use weft_core::{
    driver::{Operation, Transaction, Write, WriteMode},
    schema::ModelId,
};

/// Read access to the operations recorded by a
/// [`LoggingDriver`](crate::LoggingDriver).
#[derive(Debug, Clone)]
pub struct ExecLog {
    ops: Arc<Mutex<Vec<DriverOp>>>,
}

impl ExecLog {
    pub(crate) fn new(ops: Arc<Mutex<Vec<DriverOp>>>) -> Self {
        Self { ops }
    }

    pub fn len(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().unwrap().is_empty()
    }

    /// Returns true if any logged operation matches `predicate`
    pub fn any(&self, predicate: impl Fn(&Operation) -> bool) -> bool {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .any(|op| predicate(&op.operation))
    }

    pub fn count(&self, predicate: impl Fn(&Operation) -> bool) -> usize {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| predicate(&op.operation))
            .count()
    }

    pub fn reads(&self) -> usize {
        self.count(Operation::is_read)
    }

    pub fn writes(&self) -> usize {
        self.count(Operation::is_write)
    }

    pub fn inserts(&self, model: ModelId) -> usize {
        self.count(|op| {
            matches!(
                op,
                Operation::Write(Write { model: m, mode: WriteMode::Insert(_) }) if *m == model
            )
        })
    }

    pub fn updates(&self, model: ModelId) -> usize {
        self.count(|op| {
            matches!(
                op,
                Operation::Write(Write { model: m, mode: WriteMode::Update { .. } }) if *m == model
            )
        })
    }

    pub fn has_start(&self) -> bool {
        self.any(|op| matches!(op, Operation::Transaction(Transaction::Start)))
    }

    pub fn has_commit(&self) -> bool {
        self.any(|op| matches!(op, Operation::Transaction(Transaction::Commit)))
    }

    pub fn has_rollback(&self) -> bool {
        self.any(|op| matches!(op, Operation::Transaction(Transaction::Rollback)))
    }

    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }

    /// Remove and return the oldest logged operation
    #[track_caller]
    pub fn pop(&self) -> (Operation, Option<weft_core::driver::Response>) {
        let mut ops = self.ops.lock().unwrap();
        assert!(!ops.is_empty(), "no operations logged");
        let op = ops.remove(0);
        (op.operation, op.response)
    }

    /// Run `f` against the raw log
    pub fn with_ops<R>(&self, f: impl FnOnce(&[DriverOp]) -> R) -> R {
        let ops = self.ops.lock().unwrap();
        f(&ops)
    }
}
