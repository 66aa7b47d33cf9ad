//! `UMINUS`

use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;

pub fn negate(value: &Value) -> Result<Value, RuntimeError> {
    match value {
        Value::Integer(n) => n
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| RuntimeError::IntegerOverflow {
                operation: "UMINUS".to_string(),
            }),
        Value::Float(x) => Ok(Value::Float(-x)),
        other => Err(RuntimeError::type_mismatch("Integer or Float", other)),
    }
}
