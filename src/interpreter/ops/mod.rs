//! Pure value operators used by the engine's dispatch.
//!
//! - [`binary`]: arithmetic (with pointer offsets), comparison, logic
//! - [`unary`]: negation
//! - [`strings`]: text concatenation, length, character access

pub mod binary;
pub mod strings;
pub mod unary;
