mod direction;
pub use direction::Direction;

mod eval;
pub use eval::Input;

mod expr;
pub use expr::{BinaryOp, Expr};

mod field_ref;
pub use field_ref::FieldRef;

mod join;
pub use join::{Join, JoinKind, JoinOn};

mod order_by;
pub use order_by::OrderBy;

mod preload;
pub use preload::{Preload, Strategy};

mod query;
pub use query::{Query, QueryDisplay};

mod ty;
pub use ty::Type;

mod value;
pub use value::Value;

mod value_cmp;

mod value_record;
pub use value_record::ValueRecord;
