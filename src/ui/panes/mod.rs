//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`source`]: 3AC listing with highlighting, current line and breakpoints
//! - [`stack`]: Globals, watches and call frames with locals and references
//! - [`heap`]: Heap blocks with their cells; freed blocks as tombstones
//! - [`terminal`]: Console output from `PRINT` and log entries
//! - [`status`]: Status bar with keybindings and execution state
//! - `utils`: Shared value formatting and scrolling helpers
//!
//! # Architecture
//!
//! Each pane module exports:
//! - A primary `render_*_pane()` function
//! - Associated state types (e.g., `ScrollState`, `RenderData`)

mod utils;

pub mod heap;
pub mod source;
pub mod stack;
pub mod status;
pub mod terminal;

// Re-export render functions for convenience
pub use heap::{render_heap_pane, HeapRenderData, HeapScrollState};
pub use source::{render_source_pane, SourceRenderData, SourceScrollState};
pub use stack::{render_stack_pane, StackRenderData, StackScrollState};
pub use status::{render_status_bar, RunState, StatusRenderData};
pub use terminal::{render_terminal_pane, TerminalRenderData, TerminalScrollState};
