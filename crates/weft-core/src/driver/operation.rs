use crate::{
    schema::{FieldId, ModelId},
    stmt::{Query, Value, ValueRecord},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Read rows matching a query. Preloads are resolved by the engine, not
    /// the adapter.
    Read(Query),

    /// Insert, update or delete a single record
    Write(Write),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),

    /// Apply one association's delete policy to the children of a parent
    Cascade(Cascade),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub model: ModelId,
    pub mode: WriteMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteMode {
    /// Insert a record. Association slots are ignored and auto fields left
    /// `Null` are populated by the adapter. Responds with the stored record.
    Insert(ValueRecord),

    /// Set the given field indices on the record with primary key `key`.
    /// Responds with the stored record.
    Update {
        key: Value,
        changes: Vec<(usize, Value)>,
    },

    /// Delete the record with primary key `key`, applying the delete policy
    /// of every association that depends on it first. Responds with the
    /// number of deleted records.
    Delete { key: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Start a transaction
    Start,

    /// Commit a transaction
    Commit,

    /// Rollback a transaction
    Rollback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    /// The `has_many`/`has_one` association whose policy is applied
    pub relation: FieldId,

    /// Value of the key the children's foreign key references
    pub parent: Value,
}

impl Operation {
    pub fn is_read(&self) -> bool {
        matches!(self, Operation::Read(_))
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Operation::Write(_))
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self, Operation::Transaction(_))
    }
}

impl Write {
    pub fn insert(model: ModelId, record: ValueRecord) -> Write {
        Write {
            model,
            mode: WriteMode::Insert(record),
        }
    }

    pub fn update(model: ModelId, key: Value, changes: Vec<(usize, Value)>) -> Write {
        Write {
            model,
            mode: WriteMode::Update { key, changes },
        }
    }

    pub fn delete(model: ModelId, key: Value) -> Write {
        Write {
            model,
            mode: WriteMode::Delete { key },
        }
    }
}

impl From<Query> for Operation {
    fn from(value: Query) -> Operation {
        Operation::Read(value)
    }
}

impl From<Write> for Operation {
    fn from(value: Write) -> Operation {
        Operation::Write(value)
    }
}

impl From<Transaction> for Operation {
    fn from(value: Transaction) -> Operation {
        Operation::Transaction(value)
    }
}

impl From<Cascade> for Operation {
    fn from(value: Cascade) -> Operation {
        Operation::Cascade(value)
    }
}
