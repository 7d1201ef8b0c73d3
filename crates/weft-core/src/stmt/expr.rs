use super::{FieldRef, Value};

use std::fmt;

/// Filter predicate over the fields of a query's source and joined models.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// All operands hold
    And(Vec<Expr>),

    /// At least one operand holds
    Or(Vec<Expr>),

    Not(Box<Expr>),

    /// Compare a field with a constant
    BinaryOp {
        lhs: FieldRef,
        op: BinaryOp,
        rhs: Value,
    },

    /// The field's value is one of `list`
    InList { field: FieldRef, list: Vec<Value> },

    IsNull(FieldRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
}

impl Expr {
    pub fn eq(lhs: impl Into<FieldRef>, rhs: impl Into<Value>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Eq, rhs)
    }

    pub fn ne(lhs: impl Into<FieldRef>, rhs: impl Into<Value>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Ne, rhs)
    }

    pub fn lt(lhs: impl Into<FieldRef>, rhs: impl Into<Value>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Lt, rhs)
    }

    pub fn le(lhs: impl Into<FieldRef>, rhs: impl Into<Value>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Le, rhs)
    }

    pub fn gt(lhs: impl Into<FieldRef>, rhs: impl Into<Value>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Gt, rhs)
    }

    pub fn ge(lhs: impl Into<FieldRef>, rhs: impl Into<Value>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Ge, rhs)
    }

    pub fn binary_op(lhs: impl Into<FieldRef>, op: BinaryOp, rhs: impl Into<Value>) -> Expr {
        Expr::BinaryOp {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
        }
    }

    pub fn in_list<I, V>(field: impl Into<FieldRef>, list: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::InList {
            field: field.into(),
            list: list.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(field: impl Into<FieldRef>) -> Expr {
        Expr::IsNull(field.into())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Expr {
        Expr::Not(Box::new(expr))
    }

    pub fn and(operands: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(operands.into_iter().collect())
    }

    pub fn or(operands: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(operands.into_iter().collect())
    }

    /// Calls `f` with every field reference in the expression.
    pub fn for_each_field(&self, f: &mut impl FnMut(&FieldRef)) {
        match self {
            Expr::And(operands) | Expr::Or(operands) => {
                for operand in operands {
                    operand.for_each_field(f);
                }
            }
            Expr::Not(expr) => expr.for_each_field(f),
            Expr::BinaryOp { lhs, .. } => f(lhs),
            Expr::InList { field, .. } => f(field),
            Expr::IsNull(field) => f(field),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOp::*;

        match self {
            Eq => "=".fmt(f),
            Ne => "!=".fmt(f),
            Ge => ">=".fmt(f),
            Gt => ">".fmt(f),
            Le => "<=".fmt(f),
            Lt => "<".fmt(f),
        }
    }
}
