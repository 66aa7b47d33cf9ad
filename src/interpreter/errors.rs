//! Runtime error types for the virtual machine
//!
//! - [`AddressError`]: failures resolving or dereferencing an address
//! - [`RuntimeError`]: everything an instruction can fail with
//! - [`ExecutionError`]: a [`RuntimeError`] pinned to the faulting
//!   instruction (program counter, source line, opcode)
//!
//! All runtime errors are fatal. The engine halts, leaves memory exactly as it
//! was at the point of failure, and logs the [`ExecutionError`] to the sink.

use crate::memory::value::Value;
use crate::parser::instruction::{Instruction, Opcode};
use thiserror::Error;

/// Errors raised by the address model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Name not found in the current frame or global memory.
    #[error("'{name}' is not in scope")]
    OutOfScope { name: String },

    /// Heap block already freed, or a free of something that is not a block.
    #[error("use after free: {target}")]
    UseAfterFree { target: String },

    /// Stack pointer whose frame has returned.
    #[error("stale pointer into frame #{frame} (generation {generation}) which has returned")]
    StaleFrame { frame: u32, generation: u32 },

    #[error("index {index} out of bounds for extent {size}")]
    IndexOutOfBounds { index: i64, size: usize },
}

impl AddressError {
    pub fn kind(&self) -> &'static str {
        match self {
            AddressError::OutOfScope { .. } => "OutOfScope",
            AddressError::UseAfterFree { .. } => "UseAfterFree",
            AddressError::StaleFrame { .. } => "StaleFrame",
            AddressError::IndexOutOfBounds { .. } => "IndexOutOfBounds",
        }
    }
}

/// Errors an instruction can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {operation}")]
    IntegerOverflow { operation: String },

    #[error(transparent)]
    Address(#[from] AddressError),

    /// Call-site argument count disagrees with the queue or the declaration.
    #[error("call to '{function}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("RETURN with no active frame")]
    StackUnderflow,

    #[error("call depth limit of {limit} frames exceeded")]
    StackOverflow { limit: usize },

    #[error("out of heap memory: requested {requested} cells, {available} available")]
    OutOfMemory { requested: usize, available: usize },

    #[error("allocation size must be positive, got {size}")]
    InvalidAllocation { size: i64 },

    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: u64 },
}

impl RuntimeError {
    /// Build a type mismatch from the offending value.
    pub fn type_mismatch(expected: impl Into<String>, found: &Value) -> Self {
        RuntimeError::TypeMismatch {
            expected: expected.into(),
            found: format!("{} {}", found.type_name(), found.debug_repr()),
        }
    }

    /// Short, stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeError::TypeMismatch { .. } => "TypeMismatch",
            RuntimeError::DivisionByZero => "DivisionByZero",
            RuntimeError::IntegerOverflow { .. } => "IntegerOverflow",
            RuntimeError::Address(inner) => inner.kind(),
            RuntimeError::ArityMismatch { .. } => "ArityMismatch",
            RuntimeError::StackUnderflow => "StackUnderflow",
            RuntimeError::StackOverflow { .. } => "StackOverflow",
            RuntimeError::OutOfMemory { .. } => "OutOfMemory",
            RuntimeError::InvalidAllocation { .. } => "InvalidAllocation",
            RuntimeError::StepLimitExceeded { .. } => "StepLimitExceeded",
        }
    }

    /// The wrapped address error, if this is one.
    pub fn as_address(&self) -> Option<&AddressError> {
        match self {
            RuntimeError::Address(inner) => Some(inner),
            _ => None,
        }
    }
}

/// A fatal error together with where it happened.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at pc {pc} ({opcode}, line {line}): {error}")]
pub struct ExecutionError {
    pub kind: &'static str,
    pub pc: usize,
    pub line: usize,
    pub opcode: Opcode,
    pub error: RuntimeError,
}

impl ExecutionError {
    pub fn new(pc: usize, instruction: &Instruction, error: RuntimeError) -> Self {
        ExecutionError {
            kind: error.kind(),
            pc,
            line: instruction.line,
            opcode: instruction.opcode,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::instruction::Operand;

    #[test]
    fn address_errors_report_their_own_kind() {
        let err: RuntimeError = AddressError::StaleFrame {
            frame: 2,
            generation: 3,
        }
        .into();
        assert_eq!(err.kind(), "StaleFrame");
        assert!(err.as_address().is_some());
    }

    #[test]
    fn execution_error_message_names_pc_and_opcode() {
        let instr = Instruction {
            opcode: Opcode::Div,
            operands: vec![
                Operand::Variable("r".to_string()),
                Operand::Immediate(Value::Integer(1)),
                Operand::Immediate(Value::Integer(0)),
            ],
            line: 7,
        };
        let err = ExecutionError::new(4, &instr, RuntimeError::DivisionByZero);
        assert_eq!(
            err.to_string(),
            "DivisionByZero at pc 4 (DIV, line 7): division by zero"
        );
    }

    #[test]
    fn type_mismatch_describes_value() {
        let err = RuntimeError::type_mismatch("Boolean", &Value::Integer(3));
        assert_eq!(
            err.to_string(),
            "type mismatch: expected Boolean, got Integer 3"
        );
    }
}
