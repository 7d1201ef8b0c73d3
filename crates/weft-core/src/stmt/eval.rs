use super::{BinaryOp, Expr, FieldRef, Value};
use crate::{Error, Result};

use std::cmp::Ordering;

/// Supplies field values while evaluating a filter against one row.
pub trait Input {
    fn resolve(&self, field: &FieldRef) -> Option<&Value>;
}

impl Expr {
    /// Evaluates the predicate. Comparisons involving `Null` are false; use
    /// [`Expr::is_null`] to match missing values.
    pub fn eval(&self, input: &impl Input) -> Result<bool> {
        Ok(match self {
            Expr::And(operands) => {
                for operand in operands {
                    if !operand.eval(input)? {
                        return Ok(false);
                    }
                }
                true
            }
            Expr::Or(operands) => {
                for operand in operands {
                    if operand.eval(input)? {
                        return Ok(true);
                    }
                }
                false
            }
            Expr::Not(expr) => !expr.eval(input)?,
            Expr::BinaryOp { lhs, op, rhs } => {
                let lhs = resolve(input, lhs)?;

                if lhs.is_null() || rhs.is_null() {
                    return Ok(false);
                }

                match op {
                    BinaryOp::Eq => lhs == rhs,
                    BinaryOp::Ne => lhs != rhs,
                    BinaryOp::Lt => lhs.compare(rhs) == Some(Ordering::Less),
                    BinaryOp::Le => matches!(
                        lhs.compare(rhs),
                        Some(Ordering::Less | Ordering::Equal)
                    ),
                    BinaryOp::Gt => lhs.compare(rhs) == Some(Ordering::Greater),
                    BinaryOp::Ge => matches!(
                        lhs.compare(rhs),
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                }
            }
            Expr::InList { field, list } => {
                let value = resolve(input, field)?;
                !value.is_null() && list.contains(value)
            }
            Expr::IsNull(field) => resolve(input, field)?.is_null(),
        })
    }
}

fn resolve<'a>(input: &'a impl Input, field: &FieldRef) -> Result<&'a Value> {
    input
        .resolve(field)
        .ok_or_else(|| Error::invalid_statement(format!("field {:?} is not in scope", field.field)))
}
