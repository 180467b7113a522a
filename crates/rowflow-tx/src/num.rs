//! Numeric folding over dynamically typed values: Int-preserving as long as
//! every operand is an Int, Float as soon as one is not.

use rowflow_core::Value;

pub(crate) fn add(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => match x.checked_add(*y) {
            Some(sum) => Some(Value::Int(sum)),
            None => Some(Value::Float(*x as f64 + *y as f64)),
        },
        _ => Some(Value::Float(a.as_f64()? + b.as_f64()?)),
    }
}

pub(crate) fn mul(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => match x.checked_mul(*y) {
            Some(product) => Some(Value::Int(product)),
            None => Some(Value::Float(*x as f64 * *y as f64)),
        },
        _ => Some(Value::Float(a.as_f64()? * b.as_f64()?)),
    }
}
