// Constants for the virtual machine

/// Starting address for heap allocations
/// Heap addresses start at 0x1000 and grow by block size; they are never reused
pub const HEAP_ADDRESS_START: u64 = 0x1000;

/// Reserved operand name that reads the most recent `RETURN` value
pub const RETURN_SLOT: &str = "RETVAL";

/// Prefix for positional parameter names when a label declares no parameter list
pub const ARG_PREFIX: &str = "ARG";
