//! Virtual machine execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: [`Interpreter`](engine::Interpreter), machine state and the
//!   fetch-decode-execute loop
//! - [`errors`]: Runtime error types
//! - [`ops`]: Pure value operators (arithmetic, comparison, logic, strings)
//! - [`debugger`]: Stepping, breakpoints, watches and reverse execution
//!
//! # Execution Model
//!
//! Each step fetches the instruction at the program counter, resolves its
//! operands against the current frame and global memory, and dispatches on
//! the opcode. A handler yields an effect: store a value in the destination,
//! fall through, jump, or halt. Any error halts the machine for good and is
//! logged to the sink with the failing program counter and opcode.
//!
//! Opcode handlers live beside the engine in `calls`, `jumps` and
//! `memory_ops`.

mod calls;
pub mod constants;
pub mod debugger;
pub mod engine;
pub mod errors;
mod jumps;
mod memory_ops;
pub mod ops;
