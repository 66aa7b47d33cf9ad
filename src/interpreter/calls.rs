//! `PARAM`, `REF_PARAM`, `CALL`, `RETURN`
//!
//! Arguments are staged in the machine's pending queue before the `CALL`
//! that consumes them. A by-value argument copies the value into the callee
//! frame; a by-reference argument binds a pointer to the caller's variable so
//! reads and writes in the callee go to the caller's storage.

use crate::interpreter::constants::ARG_PREFIX;
use crate::interpreter::engine::{Effect, Interpreter, PendingArg};
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::instruction::Operand;

impl Interpreter {
    pub(crate) fn exec_param(&mut self, operand: &Operand) -> Result<Effect, RuntimeError> {
        let value = self.value_of(operand)?;
        self.machine.pending_args.push(PendingArg::Value(value));
        Ok(Effect::Next)
    }

    pub(crate) fn exec_ref_param(&mut self, operand: &Operand) -> Result<Effect, RuntimeError> {
        let name = self.name_of(operand)?;
        let target = self.machine.memory.address_of(name)?;
        self.machine.pending_args.push(PendingArg::Reference(target));
        Ok(Effect::Next)
    }

    pub(crate) fn exec_call(&mut self, ops: &[Operand]) -> Result<Effect, RuntimeError> {
        let Operand::Label(label) = &ops[0] else {
            return Err(RuntimeError::TypeMismatch {
                expected: "a label".to_string(),
                found: ops[0].to_string(),
            });
        };
        let argc = self.integer_of(&ops[1])? as usize;
        let result_dest = match ops.get(2) {
            Some(operand) => Some(self.name_of(operand)?.to_string()),
            None => None,
        };

        let queued = self.machine.pending_args.len();
        if argc != queued {
            return Err(RuntimeError::ArityMismatch {
                function: label.name.clone(),
                expected: argc,
                got: queued,
            });
        }

        let declared = self
            .program()
            .labels()
            .resolve(&label.name)
            .and_then(|def| def.params.clone());
        let names: Vec<String> = match declared {
            Some(params) if params.len() != argc => {
                return Err(RuntimeError::ArityMismatch {
                    function: label.name.clone(),
                    expected: params.len(),
                    got: argc,
                })
            }
            Some(params) => params,
            None => (0..argc).map(|i| format!("{}{}", ARG_PREFIX, i)).collect(),
        };

        let limit = self.config().max_call_depth;
        if self.machine.memory.stack.depth() >= limit {
            return Err(RuntimeError::StackOverflow { limit });
        }

        let args = std::mem::take(&mut self.machine.pending_args);
        let return_address = self.machine.pc + 1;
        self.machine
            .memory
            .stack
            .push_frame(label.name.as_str(), return_address, result_dest);

        if let Some(frame) = self.machine.memory.stack.current_frame_mut() {
            for (name, arg) in names.iter().zip(args) {
                match arg {
                    PendingArg::Value(value) => frame.set_local(name, value),
                    PendingArg::Reference(target) => frame.bind_reference(name, target),
                }
            }
        }

        Ok(Effect::Jump(label.target))
    }

    pub(crate) fn exec_return(&mut self, operand: Option<&Operand>) -> Result<Effect, RuntimeError> {
        if self.machine.memory.stack.is_empty() {
            return Err(RuntimeError::StackUnderflow);
        }
        let value = match operand {
            Some(operand) => self.value_of(operand)?,
            None => Value::Uninitialized,
        };

        let frame = self
            .machine
            .memory
            .stack
            .pop_frame()
            .ok_or(RuntimeError::StackUnderflow)?;
        let written = match &frame.result_dest {
            Some(dest) => self.assign(dest, value.clone()),
            None => Ok(()),
        };
        // A failed write leaves the callee frame and RETVAL as they were.
        if let Err(err) = written {
            self.machine.memory.stack.restore_frame(frame);
            return Err(err);
        }
        self.machine.return_value = value;

        Ok(Effect::Jump(frame.return_address))
    }
}
