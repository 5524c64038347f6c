//! Expression evaluation over a field reader
//!
//! The execution layer evaluates join-key expressions against row bodies.
//! Anything that can answer `get(field)` can be a reader; rows, maps, and
//! test fixtures all qualify.

use crate::ast::expressions::{BinaryOp, Expression};
use crate::error::{Error, Result};
use rowflow_value::Value;
use std::cmp::Ordering;

/// The context-read capability: field name to value lookup.
pub trait FieldReader {
    fn get(&self, field: &str) -> Option<&Value>;
}

/// Evaluate an expression against a reader.
///
/// Identity nodes are looked up by their full text first, then by their
/// unqualified name, so both `u.user_id` and `user_id` resolve against a
/// row keyed by bare field names.
pub fn eval(reader: &dyn FieldReader, node: &Expression) -> Result<Value> {
    match node {
        Expression::Identity(id) => {
            if let Some(v) = reader.get(&id.text) {
                return Ok(v.clone());
            }
            let (_, right) = id.left_right();
            reader
                .get(right)
                .cloned()
                .ok_or_else(|| Error::UnknownField(id.text.clone()))
        }
        Expression::Binary(bn) => {
            let lhs = eval(reader, &bn.args[0])?;
            let rhs = eval(reader, &bn.args[1])?;
            apply_binary(bn.op, &lhs, &rhs)
        }
        Expression::Function(f) => match f.name.to_lowercase().as_str() {
            "lower" | "upper" => {
                let [arg] = f.args.as_slice() else {
                    return Err(Error::TypeMismatch {
                        expected: "1 argument".to_string(),
                        found: format!("{} arguments", f.args.len()),
                    });
                };
                let v = eval(reader, arg)?;
                let s = v.as_str().ok_or_else(|| Error::TypeMismatch {
                    expected: "string".to_string(),
                    found: v.type_name().to_string(),
                })?;
                if f.name.eq_ignore_ascii_case("lower") {
                    Ok(Value::string(s.to_lowercase()))
                } else {
                    Ok(Value::string(s.to_uppercase()))
                }
            }
            _ => Err(Error::UnknownFunction(f.name.clone())),
        },
    }
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq | BinaryOp::EqEq => Ok(Value::boolean(compare(lhs, rhs)? == Ordering::Equal)),
        BinaryOp::Ne => Ok(Value::boolean(compare(lhs, rhs)? != Ordering::Equal)),
        BinaryOp::Gt => Ok(Value::boolean(compare(lhs, rhs)? == Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::boolean(compare(lhs, rhs)? != Ordering::Less)),
        BinaryOp::Lt => Ok(Value::boolean(compare(lhs, rhs)? == Ordering::Less)),
        BinaryOp::Le => Ok(Value::boolean(compare(lhs, rhs)? != Ordering::Greater)),
        BinaryOp::And => Ok(Value::boolean(truthy(lhs)? && truthy(rhs)?)),
        BinaryOp::Or => Ok(Value::boolean(truthy(lhs)? || truthy(rhs)?)),
    }
}

fn truthy(v: &Value) -> Result<bool> {
    v.as_bool().ok_or_else(|| Error::TypeMismatch {
        expected: "bool".to_string(),
        found: v.type_name().to_string(),
    })
}

fn compare(lhs: &Value, rhs: &Value) -> Result<Ordering> {
    let mismatch = || Error::TypeMismatch {
        expected: lhs.type_name().to_string(),
        found: rhs.type_name().to_string(),
    };
    match (lhs, rhs) {
        (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Ok(l.cmp(r)),
        (Value::I64(l), Value::I64(r)) => Ok(l.cmp(r)),
        (Value::Timestamp(l), Value::Timestamp(r)) => Ok(l.cmp(r)),
        (Value::Decimal(l), Value::Decimal(r)) => Ok(l.cmp(r)),
        (Value::F64(l), Value::F64(r)) => l.partial_cmp(r).ok_or_else(mismatch),
        (Value::I64(l), Value::F64(r)) => (*l as f64).partial_cmp(r).ok_or_else(mismatch),
        (Value::F64(l), Value::I64(r)) => l.partial_cmp(&(*r as f64)).ok_or_else(mismatch),
        _ => Err(mismatch()),
    }
}
