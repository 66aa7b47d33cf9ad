//! Runtime value representation
//!
//! [`Value`] is a closed sum type; every operator matches on it exhaustively,
//! so a new operand shape cannot slip past a type check.
//!
//! # Pointers
//!
//! A [`Pointer`] names one of three address spaces ([`Space`]) plus a
//! [`Slot`] inside it and the generation of its target at the time it was
//! taken:
//!
//! - `Global`: a variable name in global memory (never destroyed)
//! - `Stack(frame)`: a variable name in a particular activation record
//! - `Heap(address)`: a cell offset inside a heap block
//!
//! Dereferencing compares the stored generation with the target's current
//! one, so pointers outliving their frame or block are detected instead of
//! silently reading reused storage.

use std::fmt;

/// Heap block address.
pub type Address = u64;

/// Which storage a pointer refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Space {
    Global,
    /// Frame slot index (see [`crate::memory::stack::FrameId`]).
    Stack(u32),
    /// Base address of a heap block.
    Heap(Address),
}

/// Location within a space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Name(String),
    /// Cell offset from the block base; may go negative through arithmetic
    /// and is bounds-checked on access.
    Offset(i64),
}

/// A generation-stamped address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pointer {
    pub space: Space,
    pub slot: Slot,
    pub generation: u32,
}

impl Pointer {
    pub fn global(name: impl Into<String>) -> Self {
        Pointer {
            space: Space::Global,
            slot: Slot::Name(name.into()),
            generation: 0,
        }
    }

    pub fn local(frame: u32, generation: u32, name: impl Into<String>) -> Self {
        Pointer {
            space: Space::Stack(frame),
            slot: Slot::Name(name.into()),
            generation,
        }
    }

    pub fn heap(address: Address, generation: u32) -> Self {
        Pointer {
            space: Space::Heap(address),
            slot: Slot::Offset(0),
            generation,
        }
    }

    pub fn is_heap(&self) -> bool {
        matches!(self.space, Space::Heap(_))
    }

    /// Shift a heap pointer by `delta` cells. `None` for named slots.
    pub fn offset_by(&self, delta: i64) -> Option<Pointer> {
        match self.slot {
            Slot::Offset(offset) => Some(Pointer {
                slot: Slot::Offset(offset.checked_add(delta)?),
                ..self.clone()
            }),
            Slot::Name(_) => None,
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.space, &self.slot) {
            (Space::Global, Slot::Name(name)) => write!(f, "global:{}", name),
            (Space::Stack(frame), Slot::Name(name)) => {
                write!(f, "frame#{}g{}:{}", frame, self.generation, name)
            }
            (Space::Heap(addr), Slot::Offset(0)) => {
                write!(f, "heap:0x{:x}g{}", addr, self.generation)
            }
            (Space::Heap(addr), Slot::Offset(offset)) => {
                write!(f, "heap:0x{:x}g{}[{}]", addr, self.generation, offset)
            }
            (_, Slot::Name(name)) => write!(f, "?:{}", name),
            (_, Slot::Offset(offset)) => write!(f, "?[{}]", offset),
        }
    }
}

/// Runtime values.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Pointer(Pointer),
    #[default]
    Uninitialized,
}

impl Value {
    /// Tag name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Boolean(_) => "Boolean",
            Value::Text(_) => "Text",
            Value::Pointer(_) => "Pointer",
            Value::Uninitialized => "Uninitialized",
        }
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self, Value::Uninitialized)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&Pointer> {
        match self {
            Value::Pointer(p) => Some(p),
            _ => None,
        }
    }

    /// Like `Display`, but quotes text. Used in diagnostics and the debugger.
    pub fn debug_repr(&self) -> String {
        match self {
            Value::Text(s) => format!("{:?}", s),
            other => other.to_string(),
        }
    }
}

/// The `PRINT` format.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => f.write_str(s),
            Value::Pointer(p) => write!(f, "&{}", p),
            Value::Uninitialized => f.write_str("uninitialized"),
        }
    }
}
