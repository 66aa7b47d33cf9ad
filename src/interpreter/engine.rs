// Execution engine for the virtual machine

use crate::config::VmConfig;
use crate::interpreter::constants::RETURN_SLOT;
use crate::interpreter::errors::{AddressError, ExecutionError, RuntimeError};
use crate::interpreter::ops::{binary, strings, unary};
use crate::memory::value::{Pointer, Value};
use crate::memory::Memory;
use crate::parser::instruction::{Instruction, Opcode, Operand, Program};
use crate::sink::Sink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An argument staged by `PARAM` / `REF_PARAM` for the next `CALL`.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingArg {
    Value(Value),
    Reference(Pointer),
}

/// Why execution stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum HaltReason {
    /// The program counter ran past the last instruction.
    EndOfProgram,
    /// A `HALT` instruction executed.
    HaltInstruction,
    /// The host asked for a halt through a [`HaltHandle`].
    HostRequest,
    /// A runtime error.
    Fault(ExecutionError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Running,
    Halted(HaltReason),
}

/// What an instruction handler asks the loop to do next.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Effect {
    /// Fall through to `pc + 1`.
    Next,
    /// Write the value to operand 0, then fall through.
    Store(Value),
    /// Continue at an instruction index.
    Jump(usize),
    Halt,
}

/// Complete mutable state of a run. Cloning it is how the debugger records
/// history.
#[derive(Debug, Clone)]
pub struct Machine {
    pub pc: usize,
    pub memory: Memory,
    pub pending_args: Vec<PendingArg>,
    /// Value of the most recent `RETURN` (readable as `RETVAL`)
    pub return_value: Value,
    pub status: Status,
    /// Instructions executed so far
    pub steps: u64,
}

impl Machine {
    pub fn new(config: &VmConfig) -> Self {
        Machine {
            pc: 0,
            memory: Memory::new(config.max_heap_cells),
            pending_args: Vec::new(),
            return_value: Value::Uninitialized,
            status: Status::Running,
            steps: 0,
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.status, Status::Halted(_))
    }
}

/// Lets another thread ask a running interpreter to stop between
/// instructions.
#[derive(Debug, Clone, Default)]
pub struct HaltHandle(Arc<AtomicBool>);

impl HaltHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The fetch-decode-execute loop over a loaded [`Program`]
pub struct Interpreter {
    program: Arc<Program>,
    pub(crate) machine: Machine,
    pub(crate) sink: Sink,
    config: VmConfig,
    halt: HaltHandle,
}

impl Interpreter {
    /// Create an interpreter positioned at instruction 0.
    pub fn new(program: Program, sink: Sink, config: VmConfig) -> Self {
        Interpreter {
            program: Arc::new(program),
            machine: Machine::new(&config),
            sink,
            config,
            halt: HaltHandle::default(),
        }
    }

    /// Run until the machine halts.
    ///
    /// Returns the halt reason for a clean stop, or the fault that ended the
    /// run. In both cases the final state stays available via
    /// [`Interpreter::machine`].
    pub fn run(&mut self) -> Result<HaltReason, ExecutionError> {
        while self.step()? {}
        match &self.machine.status {
            Status::Halted(HaltReason::Fault(err)) => Err(err.clone()),
            Status::Halted(reason) => Ok(reason.clone()),
            Status::Running => unreachable!("step() returned false while running"),
        }
    }

    /// Execute one instruction.
    ///
    /// Returns `Ok(true)` if the machine is still running afterwards,
    /// `Ok(false)` once it has halted normally.
    pub fn step(&mut self) -> Result<bool, ExecutionError> {
        if self.machine.is_halted() {
            return Ok(false);
        }
        if self.halt.is_requested() {
            self.sink.log(format!("halt requested by host at pc {}", self.machine.pc));
            self.machine.status = Status::Halted(HaltReason::HostRequest);
            return Ok(false);
        }

        let program = Arc::clone(&self.program);
        let pc = self.machine.pc;
        let Some(instruction) = program.instruction(pc) else {
            self.sink.log(format!(
                "program finished after {} instruction(s)",
                self.machine.steps
            ));
            self.machine.status = Status::Halted(HaltReason::EndOfProgram);
            return Ok(false);
        };

        let effect = match self.config.max_steps {
            Some(limit) if self.machine.steps >= limit => {
                Err(RuntimeError::StepLimitExceeded { limit })
            }
            _ => self.execute(instruction),
        };

        let effect = effect
            .and_then(|effect| self.apply(instruction, effect))
            .map_err(|error| ExecutionError::new(pc, instruction, error));

        match effect {
            Ok(running) => {
                self.machine.steps += 1;
                Ok(running)
            }
            Err(fault) => {
                self.sink.log(fault.to_string());
                self.machine.status = Status::Halted(HaltReason::Fault(fault.clone()));
                Err(fault)
            }
        }
    }

    fn apply(&mut self, instruction: &Instruction, effect: Effect) -> Result<bool, RuntimeError> {
        match effect {
            Effect::Next => self.machine.pc += 1,
            Effect::Store(value) => {
                let dest = self.dest(instruction)?;
                self.assign(dest, value)?;
                self.machine.pc += 1;
            }
            Effect::Jump(target) => self.machine.pc = target,
            Effect::Halt => {
                self.sink.log(format!("program halted at pc {}", self.machine.pc));
                self.machine.status = Status::Halted(HaltReason::HaltInstruction);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Dispatch one instruction to its handler.
    fn execute(&mut self, instruction: &Instruction) -> Result<Effect, RuntimeError> {
        let ops = &instruction.operands;
        match instruction.opcode {
            Opcode::Assign | Opcode::ConstAssign => Ok(Effect::Store(self.value_of(&ops[1])?)),

            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                let (a, b) = self.operand_pair(ops)?;
                binary::arithmetic(instruction.opcode, &a, &b).map(Effect::Store)
            }
            Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Gt | Opcode::Le | Opcode::Ge => {
                let (a, b) = self.operand_pair(ops)?;
                binary::compare(instruction.opcode, &a, &b).map(Effect::Store)
            }
            Opcode::And | Opcode::Or => {
                let (a, b) = self.operand_pair(ops)?;
                binary::logical(instruction.opcode, &a, &b).map(Effect::Store)
            }
            Opcode::Uminus => unary::negate(&self.value_of(&ops[1])?).map(Effect::Store),

            Opcode::Concat => {
                let (a, b) = self.operand_pair(ops)?;
                strings::concat(&a, &b).map(Effect::Store)
            }
            Opcode::Strlen => strings::strlen(&self.value_of(&ops[1])?).map(Effect::Store),
            Opcode::Getchar => {
                let (s, index) = self.operand_pair(ops)?;
                strings::getchar(&s, &index).map(Effect::Store)
            }

            Opcode::Jump => self.exec_jump(&ops[0]),
            Opcode::JumpT => self.exec_conditional_jump(&ops[0], &ops[1], true),
            Opcode::JumpF => self.exec_conditional_jump(&ops[0], &ops[1], false),

            Opcode::Param => self.exec_param(&ops[0]),
            Opcode::RefParam => self.exec_ref_param(&ops[0]),
            Opcode::Call => self.exec_call(ops),
            Opcode::Return => self.exec_return(ops.first()),

            Opcode::AllocHeap => self.exec_alloc_heap(&ops[1]),
            Opcode::FreeHeap => self.exec_free_heap(&ops[0]),
            Opcode::AddrOf => self.exec_addr_of(&ops[1]),
            Opcode::DerefLoad => self.exec_deref_load(&ops[1]),
            Opcode::DerefStore => self.exec_deref_store(&ops[0], &ops[1]),
            Opcode::IndexLoad => self.exec_index_load(&ops[1], &ops[2]),
            Opcode::IndexStore => self.exec_index_store(&ops[0], &ops[1], &ops[2]),

            Opcode::Print => {
                let value = self.value_of(&ops[0])?;
                self.sink.output(value.to_string());
                Ok(Effect::Next)
            }
            Opcode::Halt => Ok(Effect::Halt),
        }
    }

    /// Evaluate operands 1 and 2.
    fn operand_pair(&self, ops: &[Operand]) -> Result<(Value, Value), RuntimeError> {
        Ok((self.value_of(&ops[1])?, self.value_of(&ops[2])?))
    }

    /// Resolve an operand to the value it denotes.
    pub(crate) fn value_of(&self, operand: &Operand) -> Result<Value, RuntimeError> {
        match operand {
            Operand::Immediate(value) => Ok(value.clone()),
            Operand::Variable(name) | Operand::Pointer(name) => Ok(self.inspect(name)?),
            Operand::Label(label) => Err(RuntimeError::TypeMismatch {
                expected: "a value".to_string(),
                found: format!("label {}", label.name),
            }),
        }
    }

    /// Evaluate an operand that must hold a pointer.
    pub(crate) fn pointer_of(&self, operand: &Operand) -> Result<Pointer, RuntimeError> {
        match self.value_of(operand)? {
            Value::Pointer(ptr) => Ok(ptr),
            other => Err(RuntimeError::type_mismatch("Pointer", &other)),
        }
    }

    /// Evaluate an operand that must hold an Integer.
    pub(crate) fn integer_of(&self, operand: &Operand) -> Result<i64, RuntimeError> {
        let value = self.value_of(operand)?;
        value
            .as_int()
            .ok_or_else(|| RuntimeError::type_mismatch("Integer", &value))
    }

    /// Name in a variable-name operand position.
    pub(crate) fn name_of<'a>(&self, operand: &'a Operand) -> Result<&'a str, RuntimeError> {
        match operand {
            Operand::Variable(name) | Operand::Pointer(name) => Ok(name),
            other => Err(RuntimeError::TypeMismatch {
                expected: "a variable name".to_string(),
                found: other.to_string(),
            }),
        }
    }

    fn dest<'a>(&self, instruction: &'a Instruction) -> Result<&'a str, RuntimeError> {
        self.name_of(&instruction.operands[0])
    }

    /// Assign a variable in the current scope.
    pub(crate) fn assign(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        Ok(self.machine.memory.store_var(name, value)?)
    }

    /// Look up a variable the way an operand would, including `RETVAL`.
    pub fn inspect(&self, name: &str) -> Result<Value, AddressError> {
        if name == RETURN_SLOT {
            return Ok(self.machine.return_value.clone());
        }
        self.machine.memory.load_var(name)
    }

    /// Replace the machine state (used to step backwards).
    pub fn restore(&mut self, machine: Machine) {
        self.machine = machine;
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn memory(&self) -> &Memory {
        &self.machine.memory
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn status(&self) -> &Status {
        &self.machine.status
    }

    pub fn is_halted(&self) -> bool {
        self.machine.is_halted()
    }

    pub fn pc(&self) -> usize {
        self.machine.pc
    }

    /// Source line of the next instruction, if any.
    pub fn current_line(&self) -> Option<usize> {
        self.program.line_of(self.machine.pc)
    }

    /// A handle other threads can use to request a halt.
    pub fn halt_handle(&self) -> HaltHandle {
        self.halt.clone()
    }
}
