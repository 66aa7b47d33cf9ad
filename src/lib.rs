//! # Introduction
//!
//! tacvm loads programs written in a three-address-code (3AC) instruction
//! language and executes them on a small virtual machine whose memory model
//! detects dangling references: every pointer carries the generation of the
//! frame or heap block it points into, and a mismatch at dereference time is
//! reported instead of reading stale data.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source lines → Loader → Program + LabelTable → Interpreter → Sink → Console / TUI
//! ```
//!
//! 1. [`parser`]: tokenises each line, checks operand arity and kinds per
//!    opcode, and links labels into a [`parser::instruction::Program`].
//! 2. [`interpreter`]: fetch/decode/execute loop, call stack handling and the
//!    interactive [`interpreter::debugger::Debugger`].
//! 3. [`memory`]: tagged [`memory::value::Value`]s stored in globals, a
//!    generational [`memory::stack::Stack`] and a tombstoning
//!    [`memory::heap::Heap`].
//! 4. [`sink`]: ordered `Output`/`Log` event channel between the engine and
//!    whatever displays it.
//! 5. [`snapshot`]: bounded history of machine states for stepping backwards.
//! 6. [`config`]: runtime limits and command-line options.
//! 7. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Example
//!
//! ```
//! use tacvm::config::VmConfig;
//! use tacvm::interpreter::engine::Interpreter;
//! use tacvm::parser::load_program;
//! use tacvm::sink::Console;
//!
//! let program = load_program("MUL x, 6, 7\nPRINT x").unwrap();
//! let (sink, mut console) = Console::attach();
//! let mut vm = Interpreter::new(program, sink, VmConfig::default());
//! vm.run().unwrap();
//! console.drain();
//! assert_eq!(console.output_lines(), vec!["42"]);
//! ```

pub mod config;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod sink;
pub mod snapshot;
pub mod ui;
