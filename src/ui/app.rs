//! Main TUI application state and logic

use super::panes::{
    render_heap_pane, render_source_pane, render_stack_pane, render_status_bar,
    render_terminal_pane, HeapRenderData, HeapScrollState, RunState, SourceRenderData,
    SourceScrollState, StackRenderData, StackScrollState, StatusRenderData, TerminalRenderData,
    TerminalScrollState,
};
use crate::interpreter::debugger::{Debugger, RunOutcome};
use crate::interpreter::engine::{HaltReason, Status};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Instructions `Enter` may run before giving control back to the UI.
const RUN_BUDGET: usize = 1_000_000;
const PLAY_INTERVAL: Duration = Duration::from_millis(500);

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Stack,
    Heap,
    Terminal,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> terminal -> stack -> heap)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Terminal,
            FocusedPane::Terminal => FocusedPane::Stack,
            FocusedPane::Stack => FocusedPane::Heap,
            FocusedPane::Heap => FocusedPane::Source,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Heap,
            FocusedPane::Terminal => FocusedPane::Source,
            FocusedPane::Stack => FocusedPane::Terminal,
            FocusedPane::Heap => FocusedPane::Stack,
        }
    }
}

/// The main application state
pub struct App {
    pub debugger: Debugger,

    /// The 3AC source being executed
    pub source_code: String,

    /// Currently focused pane
    pub focused_pane: FocusedPane,

    source_scroll: SourceScrollState,
    stack_scroll: StackScrollState,
    heap_scroll: HeapScrollState,
    terminal_scroll: TerminalScrollState,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    last_space_press: Instant,
}

impl App {
    pub fn new(debugger: Debugger, source_code: String) -> Self {
        let cursor = debugger.interpreter().current_line().unwrap_or(1);
        let long_ago = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .unwrap_or_else(Instant::now);
        App {
            debugger,
            source_code,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState { offset: 0, cursor },
            stack_scroll: StackScrollState {
                offset: 0,
                prev_item_count: 0,
            },
            heap_scroll: HeapScrollState {
                offset: 0,
                prev_item_count: 0,
            },
            terminal_scroll: TerminalScrollState { offset: 0 },
            should_quit: false,
            status_message: String::from("Ready!"),
            is_playing: false,
            last_play_time: long_ago,
            last_space_press: long_ago,
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= PLAY_INTERVAL {
                self.step_forward();
                if self.debugger.interpreter().is_halted() {
                    self.is_playing = false;
                }
                self.last_play_time = Instant::now();
            }

            // Use poll with timeout to allow auto-play to work
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn run_state(&self) -> RunState {
        match self.debugger.interpreter().status() {
            Status::Halted(HaltReason::Fault(_)) => RunState::Faulted,
            Status::Halted(_) => RunState::Halted,
            Status::Running if self.is_playing => RunState::Playing,
            Status::Running if self.debugger.interpreter().machine().steps == 0 => RunState::Start,
            Status::Running => RunState::Running,
        }
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // 4 panes in 2 columns, plus status bar at bottom
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        // Left column: Source (top) | Console (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Stack (top) | Heap (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(columns[1]);

        let state = self.run_state();
        let interpreter = self.debugger.interpreter();
        let machine = interpreter.machine();
        let error_line = match &machine.status {
            Status::Halted(HaltReason::Fault(err)) => Some(err.line),
            _ => None,
        };

        render_source_pane(
            frame,
            left_rows[0],
            SourceRenderData {
                source_code: &self.source_code,
                current_line: interpreter.current_line().unwrap_or(0),
                error_line,
                breakpoints: self.debugger.breakpoints(),
            },
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        render_terminal_pane(
            frame,
            left_rows[1],
            TerminalRenderData {
                events: self.debugger.console().events(),
            },
            self.focused_pane == FocusedPane::Terminal,
            &mut self.terminal_scroll,
        );

        render_stack_pane(
            frame,
            right_rows[0],
            StackRenderData {
                memory: &machine.memory,
                program: interpreter.program(),
                return_value: &machine.return_value,
                pending_args: &machine.pending_args,
                watches: self.debugger.watches(),
            },
            self.focused_pane == FocusedPane::Stack,
            &mut self.stack_scroll,
        );

        render_heap_pane(
            frame,
            right_rows[1],
            HeapRenderData {
                heap: &machine.memory.heap,
            },
            self.focused_pane == FocusedPane::Heap,
            &mut self.heap_scroll,
        );

        render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                steps: machine.steps,
                history: self.debugger.history_len(),
                state,
            },
        );
    }

    /// Handle keyboard events
    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Right | KeyCode::Char('s') => {
                self.is_playing = false;
                self.step_forward();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.step_backward();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => {
                    self.source_scroll.cursor = self.source_scroll.cursor.saturating_sub(1);
                }
                FocusedPane::Stack => {
                    self.stack_scroll.offset = self.stack_scroll.offset.saturating_sub(1);
                }
                FocusedPane::Heap => {
                    self.heap_scroll.offset = self.heap_scroll.offset.saturating_sub(1);
                }
                FocusedPane::Terminal => {
                    self.terminal_scroll.offset = self.terminal_scroll.offset.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    self.source_scroll.cursor = self.source_scroll.cursor.saturating_add(1);
                }
                FocusedPane::Stack => {
                    self.stack_scroll.offset = self.stack_scroll.offset.saturating_add(1);
                }
                FocusedPane::Heap => {
                    self.heap_scroll.offset = self.heap_scroll.offset.saturating_add(1);
                }
                FocusedPane::Terminal => {
                    self.terminal_scroll.offset = self.terminal_scroll.offset.saturating_add(1);
                }
            },
            KeyCode::Char('b') | KeyCode::Char('B') => {
                let line = self.source_scroll.cursor;
                self.status_message = if self.debugger.toggle_breakpoint(line) {
                    format!("Breakpoint set on line {}", line)
                } else {
                    format!("Breakpoint cleared on line {}", line)
                };
            }
            KeyCode::Char(' ') => {
                // Toggle auto-play mode (with 200ms debounce to prevent key repeat spam)
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing && !self.debugger.interpreter().is_halted();
                    self.status_message = if self.is_playing {
                        "Playing...".to_string()
                    } else {
                        "Paused".to_string()
                    };
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.status_message = match self.debugger.run_to_breakpoint(RUN_BUDGET) {
                    Ok(RunOutcome::Breakpoint(line)) => format!("Stopped at breakpoint on line {}", line),
                    Ok(RunOutcome::Halted) => self.halt_message(),
                    Ok(RunOutcome::Paused) => format!("Paused after {} instruction(s)", RUN_BUDGET),
                    Err(err) => err.to_string(),
                };
                self.follow_execution();
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                self.debugger.rewind_to_start();
                self.status_message = "Jumped to start".to_string();
                self.follow_execution();
            }
            _ => {}
        }
    }

    fn halt_message(&self) -> String {
        match self.debugger.interpreter().status() {
            Status::Halted(HaltReason::EndOfProgram) => "Program finished".to_string(),
            Status::Halted(HaltReason::HaltInstruction) => "Halted".to_string(),
            Status::Halted(HaltReason::HostRequest) => "Halt requested".to_string(),
            Status::Halted(HaltReason::Fault(err)) => err.to_string(),
            Status::Running => "Running".to_string(),
        }
    }

    /// Move the source cursor to the next instruction and pin the console
    /// to its newest entry.
    fn follow_execution(&mut self) {
        if let Some(line) = self.debugger.interpreter().current_line() {
            self.source_scroll.cursor = line;
        }
        self.terminal_scroll.offset = usize::MAX;
    }

    /// Step forward in execution
    fn step_forward(&mut self) {
        self.status_message = match self.debugger.step_forward() {
            Ok(true) => "Stepped forward".to_string(),
            Ok(false) => self.halt_message(),
            Err(err) => err.to_string(),
        };
        self.follow_execution();
    }

    /// Step backward in execution
    fn step_backward(&mut self) {
        self.status_message = if self.debugger.step_backward() {
            "Stepped backward".to_string()
        } else {
            "Cannot step backward: already at the oldest snapshot".to_string()
        };
        self.follow_execution();
    }
}
