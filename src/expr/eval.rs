//! Expression evaluation against bound fields

use std::cmp::Ordering;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::errors::{ExprError, ExprResult};
use super::functions::Function;
use super::value::Scalar;

/// Source of field values for `@alias` references
pub trait Bindings {
    /// Returns the bound value, or `None` if the field was never bound
    fn lookup(&self, alias: &str) -> Option<&Scalar>;
}

impl Expr {
    /// Evaluates the expression
    pub fn evaluate(&self, env: &impl Bindings) -> ExprResult<Scalar> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Field(alias) => env
                .lookup(alias)
                .cloned()
                .ok_or_else(|| ExprError::UnboundField(alias.clone())),
            Expr::Unary { op, operand } => {
                let value = operand.evaluate(env)?;
                match op {
                    UnaryOp::Neg if value.is_null() => Ok(Scalar::Null),
                    UnaryOp::Neg => Ok(Scalar::Number(-number("-", &value)?)),
                    UnaryOp::Not => Ok(Scalar::Bool(!boolean("!", &value)?)),
                }
            }
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::And => {
                    let left = boolean("&&", &lhs.evaluate(env)?)?;
                    Ok(Scalar::Bool(left && boolean("&&", &rhs.evaluate(env)?)?))
                }
                BinaryOp::Or => {
                    let left = boolean("||", &lhs.evaluate(env)?)?;
                    Ok(Scalar::Bool(left || boolean("||", &rhs.evaluate(env)?)?))
                }
                _ => binary(*op, &lhs.evaluate(env)?, &rhs.evaluate(env)?),
            },
            // An unbound argument means "does not exist" rather than an error
            Expr::Call {
                function: Function::Exists,
                args,
            } => match args[0].evaluate(env) {
                Ok(value) => Ok(Scalar::Bool(!value.is_null())),
                Err(ExprError::UnboundField(_)) => Ok(Scalar::Bool(false)),
                Err(e) => Err(e),
            },
            Expr::Call { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(env))
                    .collect::<ExprResult<Vec<_>>>()?;
                function.call(&values)
            }
        }
    }
}

fn number(context: &str, value: &Scalar) -> ExprResult<f64> {
    value
        .as_number()
        .ok_or_else(|| ExprError::type_error(format!("operator '{}'", context), "number", value.type_name()))
}

fn boolean(context: &str, value: &Scalar) -> ExprResult<bool> {
    match value {
        Scalar::Bool(b) => Ok(*b),
        other => Err(ExprError::type_error(
            format!("operator '{}'", context),
            "boolean",
            other.type_name(),
        )),
    }
}

/// Numbers compare numerically with numeric strings; otherwise exact
fn loosely_equal(a: &Scalar, b: &Scalar) -> bool {
    match (a, b) {
        (Scalar::Number(x), other) | (other, Scalar::Number(x)) => {
            other.as_number().is_some_and(|y| y == *x)
        }
        _ => a == b,
    }
}

fn ordering(op: BinaryOp, a: &Scalar, b: &Scalar) -> ExprResult<Option<Ordering>> {
    if a.is_null() || b.is_null() {
        return Ok(None);
    }
    if let (Scalar::Text(x), Scalar::Text(y)) = (a, b) {
        return Ok(Some(x.cmp(y)));
    }
    let x = number(op.symbol(), a)?;
    let y = number(op.symbol(), b)?;
    Ok(x.partial_cmp(&y))
}

fn binary(op: BinaryOp, a: &Scalar, b: &Scalar) -> ExprResult<Scalar> {
    let result = match op {
        BinaryOp::Eq => Scalar::Bool(loosely_equal(a, b)),
        BinaryOp::Ne => Scalar::Bool(!loosely_equal(a, b)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let holds = ordering(op, a, b)?.is_some_and(|o| match op {
                BinaryOp::Lt => o == Ordering::Less,
                BinaryOp::Le => o != Ordering::Greater,
                BinaryOp::Gt => o == Ordering::Greater,
                _ => o != Ordering::Less,
            });
            Scalar::Bool(holds)
        }
        _ if a.is_null() || b.is_null() => Scalar::Null,
        _ => {
            let x = number(op.symbol(), a)?;
            let y = number(op.symbol(), b)?;
            let value = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div | BinaryOp::Mod if y == 0.0 => {
                    return Err(ExprError::Domain(format!("'{}' by zero", op.symbol())));
                }
                BinaryOp::Div => x / y,
                _ => x % y,
            };
            Scalar::Number(value)
        }
    };
    Ok(result)
}
