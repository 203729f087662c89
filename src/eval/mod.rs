//! Evaluation of the default expression language.
//!
//! [`eval_expr`] walks a parsed [`Expr`] and produces a [`Value`], resolving
//! names through the caller's [`Scope`] and dispatching calls through a
//! [`Registry`]. Evaluation is read-only on both the tree and the scope, so
//! one tree can be evaluated from many threads at once.

use crate::ast::expr::*;
use crate::ast::pos::Pos;
use crate::ast::value::Value;
use crate::error::{EvalError, EvalErrorKind};
use crate::registry::Registry;

mod scope;

pub use scope::{Scope, SimpleScope};

/// Evaluate a parsed expression against a scope.
///
/// ```rust
/// use tagtpl::{eval_expr, parse_expr, Pos, Registry, SimpleScope, Value};
///
/// let expr = parse_expr("count * 2 > 5", Pos::start()).unwrap();
/// let scope = SimpleScope::new().with("count", 3i64);
/// let registry = Registry::new();
///
/// assert_eq!(eval_expr(&expr, &scope, &registry).unwrap(), Value::Bool(true));
/// ```
pub fn eval_expr(expr: &Expr, scope: &dyn Scope, registry: &Registry) -> Result<Value, EvalError> {
    let pos = expr.span.start;
    match &expr.node {
        ExprKind::Literal(val) => Ok(val.clone()),

        ExprKind::ArrayLiteral(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for elem in elements {
                values.push(eval_expr(elem, scope, registry)?);
            }
            Ok(Value::Array(values))
        }

        ExprKind::Variable(name) => scope
            .resolve(name)
            .ok_or_else(|| EvalError::undefined_variable(name).with_pos(pos)),

        ExprKind::Member { target, name } => {
            let target_val = eval_expr(target, scope, registry)?;
            match &target_val {
                Value::Map(entries) => entries.get(name).cloned().ok_or_else(|| {
                    EvalError::undefined_member(target_val.type_name(), name).with_pos(pos)
                }),
                other => Err(EvalError::type_error("map", other.type_name()).with_pos(pos)),
            }
        }

        ExprKind::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, scope, registry)?);
            }
            registry.call(name, values).map_err(|e| e.or_pos(pos))
        }

        ExprKind::BinaryOp { left, op, right } => {
            // `&&` and `||` short-circuit so that guards like
            // `user && user.name` do not evaluate the right side.
            let left_val = eval_expr(left, scope, registry)?;
            match op {
                BinOp::And if !left_val.is_truthy() => return Ok(Value::Bool(false)),
                BinOp::Or if left_val.is_truthy() => return Ok(Value::Bool(true)),
                _ => {}
            }
            let right_val = eval_expr(right, scope, registry)?;
            eval_binary_op(&left_val, *op, &right_val, pos)
        }

        ExprKind::UnaryOp { op, operand } => {
            let val = eval_expr(operand, scope, registry)?;
            eval_unary_op(*op, &val, pos)
        }
    }
}

// ── Pure operator evaluation ────────────────────────────────────────────

fn eval_binary_op(left: &Value, op: BinOp, right: &Value, pos: Pos) -> Result<Value, EvalError> {
    match op {
        BinOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinOp::NotEq => Ok(Value::Bool(!values_equal(left, right))),

        BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => {
            let l = require_number(left, pos)?;
            let r = require_number(right, pos)?;
            let result = match op {
                BinOp::Lt => l < r,
                BinOp::Gt => l > r,
                BinOp::LtEq => l <= r,
                _ => l >= r,
            };
            Ok(Value::Bool(result))
        }

        BinOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),

        BinOp::Add => eval_add(left, right, pos),
        BinOp::Sub | BinOp::Mul | BinOp::Div => {
            let l = require_number(left, pos)?;
            let r = require_number(right, pos)?;
            let result = match op {
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                _ => {
                    if r == 0.0 {
                        return Err(EvalError::new(
                            EvalErrorKind::ArithmeticError,
                            "division by zero",
                        )
                        .with_pos(pos));
                    }
                    l / r
                }
            };
            Ok(Value::Number(result))
        }
    }
}

fn eval_add(left: &Value, right: &Value, pos: Pos) -> Result<Value, EvalError> {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return Ok(Value::Number(l + r));
    }
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Ok(Value::String(format!(
            "{}{}",
            left.to_output_string(),
            right.to_output_string()
        )));
    }
    Err(EvalError::type_error(
        "number or string",
        &format!("{} + {}", left.type_name(), right.type_name()),
    )
    .with_pos(pos))
}

fn eval_unary_op(op: UnaryOp, val: &Value, pos: Pos) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!val.is_truthy())),
        UnaryOp::Neg => {
            let n = require_number(val, pos)?;
            Ok(Value::Number(-n))
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => (a - b).abs() < f64::EPSILON,
        _ => left == right,
    }
}

fn require_number(val: &Value, pos: Pos) -> Result<f64, EvalError> {
    val.as_number()
        .ok_or_else(|| EvalError::type_error("number", val.type_name()).with_pos(pos))
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;
    use std::collections::BTreeMap;

    fn eval_with(source: &str, scope: &dyn Scope) -> Result<Value, EvalError> {
        let expr = parse_expr(source, Pos::start()).expect("parse failed");
        eval_expr(&expr, scope, &Registry::with_builtins())
    }

    fn eval_simple(source: &str) -> Value {
        eval_with(source, &()).expect("eval failed")
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_simple("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(eval_simple("(1 + 2) * 3"), Value::Number(9.0));
        assert_eq!(eval_simple("-4 / 2"), Value::Number(-2.0));
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(eval_simple("'a' + 1"), Value::from("a1"));
    }

    #[test]
    fn test_comparison_and_logic() {
        assert_eq!(eval_simple("1 < 2 && 3 >= 3"), Value::Bool(true));
        assert_eq!(eval_simple("!true || 'x' == 'y'"), Value::Bool(false));
        assert_eq!(eval_simple("[1, 2] == [1, 2]"), Value::Bool(true));
    }

    #[test]
    fn test_short_circuit_skips_undefined() {
        assert_eq!(eval_simple("false && missing"), Value::Bool(false));
        assert_eq!(eval_simple("true || missing"), Value::Bool(true));
    }

    #[test]
    fn test_member_access() {
        let mut user = BTreeMap::new();
        user.insert("name".to_string(), Value::from("Ann"));
        let scope = SimpleScope::new().with("user", user);
        assert_eq!(eval_with("user.name", &scope).unwrap(), Value::from("Ann"));

        let err = eval_with("user.age", &scope).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UndefinedVariable);
        assert!(err.message.contains("age"));
    }

    #[test]
    fn test_call_through_registry() {
        let scope = SimpleScope::new().with("name", "ann");
        assert_eq!(eval_with("upper(name)", &scope).unwrap(), Value::from("ANN"));
    }

    #[test]
    fn test_undefined_variable_is_positioned() {
        let err = eval_with("1 + missing", &()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UndefinedVariable);
        assert_eq!(err.pos.map(|p| p.column), Some(5));
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval_with("1 / 0", &()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ArithmeticError);
    }

    #[test]
    fn test_type_error() {
        let err = eval_with("true - 1", &()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::TypeError);
    }

    #[test]
    fn test_unknown_function_gets_call_position() {
        let err = eval_with("  nope(1)", &()).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::UndefinedFunction);
        assert_eq!(err.pos.map(|p| p.column), Some(3));
    }
}
