//! Three-address-code loader
//!
//! This module turns source lines into a validated, linked [`Program`]:
//! - [`lexer`]: per-line tokenization (labels, mnemonics, literal operands)
//! - [`instruction`]: opcodes, operand kinds, the arity table, label table
//! - [`loader`]: two-pass assembly with label resolution and arity checks
//!
//! # Source format
//!
//! ```text
//! # comment
//! fact(n):                 # label with declared parameters
//!     LE  base, n, 1
//!     JUMPT base, done
//!     SUB m, n, 1
//!     PARAM m
//!     CALL fact, 1, r
//!     MUL r, r, n
//!     RETURN r
//! done:
//!     RETURN 1
//! ```
//!
//! Hand-written; no parser generator dependencies.

pub mod instruction;
pub mod lexer;
pub mod loader;

pub use instruction::{Instruction, LabelTable, Opcode, Operand, Program};
pub use loader::{load_lines, load_program, LoadError};
