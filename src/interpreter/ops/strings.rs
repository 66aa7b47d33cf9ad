//! `CONCAT`, `STRLEN`, `GETCHAR`
//!
//! Text values are immutable; every operation builds a new value. Lengths and
//! indices count characters, not bytes.

use crate::interpreter::errors::{AddressError, RuntimeError};
use crate::memory::value::Value;

pub fn concat(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let a = text(left)?;
    let b = text(right)?;
    let mut joined = String::with_capacity(a.len() + b.len());
    joined.push_str(a);
    joined.push_str(b);
    Ok(Value::Text(joined))
}

pub fn strlen(value: &Value) -> Result<Value, RuntimeError> {
    let count = text(value)?.chars().count();
    Ok(Value::Integer(count as i64))
}

pub fn getchar(value: &Value, index: &Value) -> Result<Value, RuntimeError> {
    let s = text(value)?;
    let i = index
        .as_int()
        .ok_or_else(|| RuntimeError::type_mismatch("Integer", index))?;
    usize::try_from(i)
        .ok()
        .and_then(|i| s.chars().nth(i))
        .map(|c| Value::Text(c.to_string()))
        .ok_or_else(|| {
            AddressError::IndexOutOfBounds {
                index: i,
                size: s.chars().count(),
            }
            .into()
        })
}

fn text(value: &Value) -> Result<&str, RuntimeError> {
    value
        .as_text()
        .ok_or_else(|| RuntimeError::type_mismatch("Text", value))
}
