//! Validated changesets, nested associations, composable queries and atomic
//! multi-step plans over a pluggable storage adapter.

pub mod association;
pub use association::{attach, nested_cast, NestedCast};

pub mod changeset;
pub use changeset::{validate, Changeset, FieldError, Input, Pipeline};

pub mod db;
pub use db::Db;

mod engine;

pub mod fold;

pub mod transaction;
pub use transaction::{CancelHandle, Plan, Results, TerminalState};

pub use weft_core::{driver, schema, stmt, Error, Result, Schema};
