//! Arithmetic, comparison and logical operators
//!
//! Integer arithmetic is checked: overflow is an error, never a wrap.
//! `DIV` and `MOD` truncate toward zero, so for `b != 0`
//! `(a / b) * b + a % b == a` and the remainder takes the sign of `a`.
//! Mixing Integer and Float promotes to Float. Comparisons require both
//! operands to carry the same tag.

use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::instruction::Opcode;
use std::cmp::Ordering;

/// `ADD`, `SUB`, `MUL`, `DIV`, `MOD`.
pub fn arithmetic(op: Opcode, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(op, *a, *b).map(Value::Integer),
        (Value::Float(a), Value::Float(b)) => float_arithmetic(op, *a, *b),
        (Value::Integer(a), Value::Float(b)) => float_arithmetic(op, *a as f64, *b),
        (Value::Float(a), Value::Integer(b)) => float_arithmetic(op, *a, *b as f64),

        // Heap element addressing: pointer ± integer moves the cell offset
        (Value::Pointer(ptr), Value::Integer(n)) if matches!(op, Opcode::Add | Opcode::Sub) => {
            let delta = if op == Opcode::Sub {
                n.checked_neg().ok_or_else(|| overflow(op))?
            } else {
                *n
            };
            ptr.offset_by(delta)
                .map(Value::Pointer)
                .ok_or_else(|| RuntimeError::type_mismatch("heap Pointer", left))
        }
        (Value::Integer(n), Value::Pointer(ptr)) if op == Opcode::Add => ptr
            .offset_by(*n)
            .map(Value::Pointer)
            .ok_or_else(|| RuntimeError::type_mismatch("heap Pointer", right)),

        (Value::Integer(_) | Value::Float(_), other) => Err(RuntimeError::type_mismatch("Integer or Float", other)),
        (other, _) => Err(RuntimeError::type_mismatch("Integer or Float", other)),
    }
}

fn integer_arithmetic(op: Opcode, a: i64, b: i64) -> Result<i64, RuntimeError> {
    let result = match op {
        Opcode::Add => a.checked_add(b),
        Opcode::Sub => a.checked_sub(b),
        Opcode::Mul => a.checked_mul(b),
        Opcode::Div | Opcode::Mod if b == 0 => return Err(RuntimeError::DivisionByZero),
        Opcode::Div => a.checked_div(b),
        Opcode::Mod => a.checked_rem(b),
        _ => unreachable!("{} is not an arithmetic opcode", op),
    };
    result.ok_or_else(|| overflow(op))
}

fn float_arithmetic(op: Opcode, a: f64, b: f64) -> Result<Value, RuntimeError> {
    let result = match op {
        Opcode::Add => a + b,
        Opcode::Sub => a - b,
        Opcode::Mul => a * b,
        Opcode::Div | Opcode::Mod if b == 0.0 => return Err(RuntimeError::DivisionByZero),
        Opcode::Div => a / b,
        Opcode::Mod => a % b,
        _ => unreachable!("{} is not an arithmetic opcode", op),
    };
    Ok(Value::Float(result))
}

fn overflow(op: Opcode) -> RuntimeError {
    RuntimeError::IntegerOverflow {
        operation: op.name().to_string(),
    }
}

/// `EQ`, `NE`, `LT`, `GT`, `LE`, `GE`.
pub fn compare(op: Opcode, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    if std::mem::discriminant(left) != std::mem::discriminant(right) || !left.is_initialized() {
        return Err(RuntimeError::type_mismatch(
            format!("{} operand", left.type_name()),
            right,
        ));
    }

    let result = match op {
        Opcode::Eq => left == right,
        Opcode::Ne => left != right,
        _ => {
            let ordering = order(left, right)?;
            match op {
                Opcode::Lt => matches!(ordering, Some(Ordering::Less)),
                Opcode::Gt => matches!(ordering, Some(Ordering::Greater)),
                Opcode::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                Opcode::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                _ => unreachable!("{} is not a comparison opcode", op),
            }
        }
    };
    Ok(Value::Boolean(result))
}

/// `None` when the operands are unordered, which makes every ordering false.
fn order(left: &Value, right: &Value) -> Result<Option<Ordering>, RuntimeError> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
        (Value::Text(a), Value::Text(b)) => Ok(Some(a.cmp(b))),
        (Value::Float(a), Value::Float(b)) => Ok(a.partial_cmp(b)),
        _ => Err(RuntimeError::type_mismatch("Integer, Float or Text", left)),
    }
}

/// `AND`, `OR`.
pub fn logical(op: Opcode, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    let a = left
        .as_bool()
        .ok_or_else(|| RuntimeError::type_mismatch("Boolean", left))?;
    let b = right
        .as_bool()
        .ok_or_else(|| RuntimeError::type_mismatch("Boolean", right))?;
    match op {
        Opcode::And => Ok(Value::Boolean(a && b)),
        Opcode::Or => Ok(Value::Boolean(a || b)),
        _ => unreachable!("{} is not a logical opcode", op),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::value::Pointer;

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    #[test]
    fn integer_arithmetic_truncates_toward_zero() {
        assert_eq!(arithmetic(Opcode::Div, &int(7), &int(2)), Ok(int(3)));
        assert_eq!(arithmetic(Opcode::Div, &int(-7), &int(2)), Ok(int(-3)));
        assert_eq!(arithmetic(Opcode::Mod, &int(-7), &int(2)), Ok(int(-1)));
        assert_eq!(arithmetic(Opcode::Mod, &int(7), &int(-2)), Ok(int(1)));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(
            arithmetic(Opcode::Div, &int(1), &int(0)),
            Err(RuntimeError::DivisionByZero)
        );
        assert_eq!(
            arithmetic(Opcode::Mod, &Value::Float(1.0), &int(0)),
            Err(RuntimeError::DivisionByZero)
        );
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(matches!(
            arithmetic(Opcode::Add, &int(i64::MAX), &int(1)),
            Err(RuntimeError::IntegerOverflow { .. })
        ));
        assert!(matches!(
            arithmetic(Opcode::Div, &int(i64::MIN), &int(-1)),
            Err(RuntimeError::IntegerOverflow { .. })
        ));
    }

    #[test]
    fn mixed_numbers_promote_to_float() {
        assert_eq!(
            arithmetic(Opcode::Mul, &int(2), &Value::Float(1.5)),
            Ok(Value::Float(3.0))
        );
        assert_eq!(
            arithmetic(Opcode::Div, &Value::Float(1.0), &int(4)),
            Ok(Value::Float(0.25))
        );
    }

    #[test]
    fn text_is_not_a_number() {
        let err = arithmetic(Opcode::Add, &Value::Text("a".into()), &int(1)).unwrap_err();
        assert_eq!(err.kind(), "TypeMismatch");
        assert!(arithmetic(Opcode::Add, &int(1), &Value::Boolean(true)).is_err());
    }

    #[test]
    fn pointer_offsets() {
        let base = Value::Pointer(Pointer::heap(0x1000, 0));
        let moved = arithmetic(Opcode::Add, &base, &int(3)).unwrap();
        assert_eq!(
            moved,
            Value::Pointer(Pointer::heap(0x1000, 0).offset_by(3).unwrap())
        );
        assert_eq!(arithmetic(Opcode::Sub, &moved, &int(3)), Ok(base.clone()));
        assert_eq!(
            arithmetic(Opcode::Add, &int(3), &base),
            Ok(moved)
        );
        assert!(arithmetic(Opcode::Mul, &base, &int(2)).is_err());
        let named = Value::Pointer(Pointer::global("x"));
        assert!(arithmetic(Opcode::Add, &named, &int(1)).is_err());
    }

    #[test]
    fn comparisons_require_matching_tags() {
        assert_eq!(
            compare(Opcode::Lt, &int(1), &int(2)),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            compare(Opcode::Ge, &Value::Text("b".into()), &Value::Text("a".into())),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            compare(Opcode::Eq, &Value::Boolean(true), &Value::Boolean(true)),
            Ok(Value::Boolean(true))
        );
        assert!(matches!(
            compare(Opcode::Eq, &int(1), &Value::Float(1.0)),
            Err(RuntimeError::TypeMismatch { .. })
        ));
        assert!(compare(Opcode::Lt, &Value::Boolean(false), &Value::Boolean(true)).is_err());
        assert!(compare(Opcode::Eq, &Value::Uninitialized, &Value::Uninitialized).is_err());
    }

    #[test]
    fn nan_is_unordered() {
        let nan = Value::Float(f64::NAN);
        let one = Value::Float(1.0);
        for op in [Opcode::Lt, Opcode::Gt, Opcode::Le, Opcode::Ge, Opcode::Eq] {
            assert_eq!(compare(op, &nan, &nan), Ok(Value::Boolean(false)), "{}", op);
            assert_eq!(compare(op, &nan, &one), Ok(Value::Boolean(false)), "{}", op);
            assert_eq!(compare(op, &one, &nan), Ok(Value::Boolean(false)), "{}", op);
        }
        assert_eq!(compare(Opcode::Ne, &nan, &nan), Ok(Value::Boolean(true)));
    }

    #[test]
    fn logical_operators() {
        let t = Value::Boolean(true);
        let f = Value::Boolean(false);
        assert_eq!(logical(Opcode::And, &t, &f), Ok(f.clone()));
        assert_eq!(logical(Opcode::Or, &t, &f), Ok(t.clone()));
        assert!(logical(Opcode::And, &t, &int(1)).is_err());
    }
}
