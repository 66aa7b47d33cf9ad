//! Interactive stepping on top of [`Interpreter`]
//!
//! The [`Debugger`] owns the interpreter together with the [`Console`]
//! listening to its sink. Before each instruction it records a [`Snapshot`]
//! so execution can be walked backwards; the console is truncated alongside
//! so output that "has not happened yet" disappears again.

use crate::config::VmConfig;
use crate::interpreter::engine::{Interpreter, Machine};
use crate::interpreter::errors::{AddressError, ExecutionError};
use crate::memory::value::Value;
use crate::parser::instruction::Program;
use crate::sink::Console;
use crate::snapshot::{History, Snapshot};
use std::collections::BTreeSet;

/// Why [`Debugger::run_to_breakpoint`] returned.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The next instruction sits on a breakpoint line.
    Breakpoint(usize),
    /// The machine halted (normally or by a fault).
    Halted,
    /// The step budget ran out first.
    Paused,
}

pub struct Debugger {
    interpreter: Interpreter,
    console: Console,
    history: History,
    initial: Machine,
    breakpoints: BTreeSet<usize>,
    watches: Vec<String>,
}

impl Debugger {
    pub fn new(program: Program, config: VmConfig) -> Self {
        let (sink, console) = Console::attach();
        let history = History::new(config.history_limit);
        let interpreter = Interpreter::new(program, sink, config);
        let initial = interpreter.machine().clone();
        Debugger {
            interpreter,
            console,
            history,
            initial,
            breakpoints: BTreeSet::new(),
            watches: Vec::new(),
        }
    }

    /// Execute one instruction. `Ok(false)` once the machine has halted.
    pub fn step_forward(&mut self) -> Result<bool, ExecutionError> {
        if self.interpreter.is_halted() {
            return Ok(false);
        }
        self.history.push(Snapshot {
            machine: self.interpreter.machine().clone(),
            console_len: self.console.len(),
        });
        let result = self.interpreter.step();
        self.console.drain();
        result
    }

    /// Undo the last instruction. Returns `false` when there is no history.
    pub fn step_backward(&mut self) -> bool {
        match self.history.pop() {
            Some(snapshot) => {
                self.interpreter.restore(snapshot.machine);
                self.console.truncate(snapshot.console_len);
                true
            }
            None => false,
        }
    }

    /// Step until a breakpoint line is reached, the machine halts, or
    /// `budget` instructions have run.
    pub fn run_to_breakpoint(&mut self, budget: usize) -> Result<RunOutcome, ExecutionError> {
        for _ in 0..budget {
            if !self.step_forward()? {
                return Ok(RunOutcome::Halted);
            }
            if let Some(line) = self.interpreter.current_line() {
                if self.breakpoints.contains(&line) {
                    return Ok(RunOutcome::Breakpoint(line));
                }
            }
        }
        Ok(if self.interpreter.is_halted() {
            RunOutcome::Halted
        } else {
            RunOutcome::Paused
        })
    }

    /// Go back to the state before the first instruction.
    pub fn rewind_to_start(&mut self) {
        self.interpreter.restore(self.initial.clone());
        self.interpreter.halt_handle().clear();
        self.console.truncate(0);
        self.history.clear();
    }

    /// Toggle a breakpoint; returns whether it is now set.
    pub fn toggle_breakpoint(&mut self, line: usize) -> bool {
        if self.breakpoints.remove(&line) {
            false
        } else {
            self.breakpoints.insert(line);
            true
        }
    }

    pub fn breakpoints(&self) -> &BTreeSet<usize> {
        &self.breakpoints
    }

    pub fn add_watch(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.watches.contains(&name) {
            self.watches.push(name);
        }
    }

    /// Watched names evaluated in the current scope.
    pub fn watches(&self) -> Vec<(&str, Result<Value, AddressError>)> {
        self.watches
            .iter()
            .map(|name| (name.as_str(), self.interpreter.inspect(name)))
            .collect()
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Number of instructions that can be stepped back.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_step_back(&self) -> bool {
        !self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::load_program;

    fn debugger(src: &str) -> Debugger {
        Debugger::new(load_program(src).unwrap(), VmConfig::default())
    }

    #[test]
    fn stepping_back_undoes_state_and_output() {
        let mut dbg = debugger("ASSIGN x, 1\nPRINT x\nASSIGN x, 2");
        dbg.step_forward().unwrap();
        dbg.step_forward().unwrap();
        dbg.step_forward().unwrap();
        assert_eq!(dbg.console().output_lines(), vec!["1"]);
        assert_eq!(dbg.interpreter().inspect("x"), Ok(Value::Integer(2)));

        assert!(dbg.step_backward());
        assert!(dbg.step_backward());
        assert!(dbg.console().output_lines().is_empty());
        assert_eq!(dbg.interpreter().pc(), 1);
        assert_eq!(dbg.interpreter().inspect("x"), Ok(Value::Integer(1)));
    }

    #[test]
    fn stepping_back_out_of_a_fault_resumes_running() {
        let mut dbg = debugger("ASSIGN x, 0\nDIV y, 1, x");
        dbg.step_forward().unwrap();
        assert!(dbg.step_forward().is_err());
        assert!(dbg.interpreter().is_halted());
        assert_eq!(dbg.console().log_lines().len(), 1);

        dbg.step_backward();
        assert!(!dbg.interpreter().is_halted());
        assert!(dbg.console().log_lines().is_empty());
    }

    #[test]
    fn run_stops_at_breakpoints() {
        let mut dbg = debugger("ASSIGN i, 0\nloop:\nADD i, i, 1\nLT c, i, 3\nJUMPT c, loop\nPRINT i");
        assert!(dbg.toggle_breakpoint(3));
        assert_eq!(dbg.run_to_breakpoint(100), Ok(RunOutcome::Breakpoint(3)));
        assert_eq!(dbg.interpreter().inspect("i"), Ok(Value::Integer(0)));
        assert_eq!(dbg.run_to_breakpoint(100), Ok(RunOutcome::Breakpoint(3)));
        assert_eq!(dbg.interpreter().inspect("i"), Ok(Value::Integer(1)));

        assert!(!dbg.toggle_breakpoint(3));
        assert_eq!(dbg.run_to_breakpoint(100), Ok(RunOutcome::Halted));
        assert_eq!(dbg.console().output_lines(), vec!["3"]);
    }

    #[test]
    fn run_respects_budget() {
        let mut dbg = debugger("top:\nJUMP top");
        assert_eq!(dbg.run_to_breakpoint(5), Ok(RunOutcome::Paused));
        assert_eq!(dbg.history_len(), 5);
    }

    #[test]
    fn rewind_restores_initial_state() {
        let mut dbg = debugger("PRINT 1\nPRINT 2");
        dbg.run_to_breakpoint(10).unwrap();
        dbg.rewind_to_start();
        assert_eq!(dbg.interpreter().pc(), 0);
        assert!(dbg.console().is_empty());
        assert!(!dbg.can_step_back());
    }

    #[test]
    fn watches_follow_scope() {
        let mut dbg = debugger("ASSIGN n, 5\nCALL f, 0\nHALT\nf:\nASSIGN n, 7\nRETURN");
        dbg.add_watch("n");
        dbg.add_watch("n");
        dbg.add_watch("missing");
        dbg.step_forward().unwrap();
        dbg.step_forward().unwrap();
        dbg.step_forward().unwrap();
        let watches = dbg.watches();
        assert_eq!(watches.len(), 2);
        assert_eq!(watches[0], ("n", Ok(Value::Integer(7))));
        assert!(watches[1].1.is_err());
    }
}
