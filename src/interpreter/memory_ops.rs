//! Heap and pointer opcodes
//!
//! - `ALLOC_HEAP` / `FREE_HEAP`: block-granular allocation
//! - `ADDR_OF`: take a generation-stamped pointer to a variable
//! - `DEREF_LOAD` / `DEREF_STORE`: access the cell a pointer names
//! - `INDEX_LOAD` / `INDEX_STORE`: access `cells[offset + index]`
//!
//! Every access goes through [`Memory`](crate::memory::Memory), which checks
//! the pointer's generation against its target before touching storage. A
//! failed check leaves all cells untouched.

use crate::interpreter::engine::{Effect, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::instruction::Operand;

impl Interpreter {
    pub(crate) fn exec_alloc_heap(&mut self, size: &Operand) -> Result<Effect, RuntimeError> {
        let requested = self.value_of(size)?;
        let n = requested
            .as_int()
            .ok_or_else(|| RuntimeError::type_mismatch("Integer", &requested))?;
        let cells = usize::try_from(n)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(RuntimeError::InvalidAllocation { size: n })?;

        let ptr = self.machine.memory.heap.allocate(cells)?;
        Ok(Effect::Store(Value::Pointer(ptr)))
    }

    pub(crate) fn exec_free_heap(&mut self, target: &Operand) -> Result<Effect, RuntimeError> {
        let ptr = self.pointer_of(target)?;
        let address = self.machine.memory.heap.free(&ptr)?;
        self.sink.log(format!("freed heap block 0x{:x}", address));
        Ok(Effect::Next)
    }

    pub(crate) fn exec_addr_of(&mut self, variable: &Operand) -> Result<Effect, RuntimeError> {
        let name = self.name_of(variable)?;
        let ptr = self.machine.memory.address_of(name)?;
        Ok(Effect::Store(Value::Pointer(ptr)))
    }

    pub(crate) fn exec_deref_load(&mut self, source: &Operand) -> Result<Effect, RuntimeError> {
        let ptr = self.pointer_of(source)?;
        let value = self.machine.memory.read(&ptr)?;
        Ok(Effect::Store(value))
    }

    pub(crate) fn exec_deref_store(&mut self, target: &Operand, value: &Operand) -> Result<Effect, RuntimeError> {
        let ptr = self.pointer_of(target)?;
        let value = self.value_of(value)?;
        self.machine.memory.write(&ptr, value)?;
        Ok(Effect::Next)
    }

    pub(crate) fn exec_index_load(&mut self, source: &Operand, index: &Operand) -> Result<Effect, RuntimeError> {
        let ptr = self.pointer_of(source)?;
        let index = self.integer_of(index)?;
        let value = self.machine.memory.read_indexed(&ptr, index)?;
        Ok(Effect::Store(value))
    }

    pub(crate) fn exec_index_store(
        &mut self,
        target: &Operand,
        index: &Operand,
        value: &Operand,
    ) -> Result<Effect, RuntimeError> {
        let ptr = self.pointer_of(target)?;
        let index = self.integer_of(index)?;
        let value = self.value_of(value)?;
        self.machine.memory.write_indexed(&ptr, index, value)?;
        Ok(Effect::Next)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::VmConfig;
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::{AddressError, RuntimeError};
    use crate::memory::value::Value;
    use crate::parser::load_program;
    use crate::sink::{Console, Sink};

    fn run(src: &str) -> (Interpreter, Result<(), RuntimeError>) {
        let mut interp = Interpreter::new(load_program(src).unwrap(), Sink::discard(), VmConfig::default());
        let result = interp.run().map(|_| ()).map_err(|e| e.error);
        (interp, result)
    }

    #[test]
    fn heap_array_round_trip() {
        let src = "\
ALLOC_HEAP arr, 3
INDEX_STORE arr, 0, 10
INDEX_STORE arr, 2, 30
INDEX_LOAD a, arr, 0
INDEX_LOAD c, arr, 2
DEREF_LOAD first, arr
ADD p, arr, 2
DEREF_LOAD last, p
";
        let (interp, result) = run(src);
        result.unwrap();
        assert_eq!(interp.inspect("a"), Ok(Value::Integer(10)));
        assert_eq!(interp.inspect("c"), Ok(Value::Integer(30)));
        assert_eq!(interp.inspect("first"), Ok(Value::Integer(10)));
        assert_eq!(interp.inspect("last"), Ok(Value::Integer(30)));
    }

    #[test]
    fn free_then_load_is_use_after_free() {
        let (_, result) = run("ALLOC_HEAP p, 2\nFREE_HEAP p\nDEREF_LOAD v, p");
        assert!(matches!(
            result,
            Err(RuntimeError::Address(AddressError::UseAfterFree { .. }))
        ));
        let (_, result) = run("ALLOC_HEAP p, 2\nFREE_HEAP p\nINDEX_LOAD v, p, 1");
        assert_eq!(result.unwrap_err().kind(), "UseAfterFree");
    }

    #[test]
    fn free_is_logged() {
        let (sink, mut console) = Console::attach();
        let program = load_program("ALLOC_HEAP p, 1\nFREE_HEAP p").unwrap();
        Interpreter::new(program, sink, VmConfig::default()).run().unwrap();
        console.drain();
        assert_eq!(console.log_lines()[0], "freed heap block 0x1000");
    }

    #[test]
    fn freeing_a_variable_pointer_is_rejected() {
        let (_, result) = run("ASSIGN x, 1\nADDR_OF p, x\nFREE_HEAP p");
        assert_eq!(result.unwrap_err().kind(), "UseAfterFree");
    }

    #[test]
    fn allocation_size_is_checked() {
        let (_, result) = run("ALLOC_HEAP p, 0");
        assert_eq!(result, Err(RuntimeError::InvalidAllocation { size: 0 }));
        let (_, result) = run("ALLOC_HEAP p, -3");
        assert_eq!(result, Err(RuntimeError::InvalidAllocation { size: -3 }));
        let (_, result) = run("ALLOC_HEAP p, \"big\"");
        assert_eq!(result.unwrap_err().kind(), "TypeMismatch");
    }

    #[test]
    fn heap_budget() {
        let program = load_program("ALLOC_HEAP a, 6\nALLOC_HEAP b, 6").unwrap();
        let config = VmConfig {
            max_heap_cells: 8,
            ..VmConfig::default()
        };
        let err = Interpreter::new(program, Sink::discard(), config)
            .run()
            .unwrap_err();
        assert_eq!(
            err.error,
            RuntimeError::OutOfMemory {
                requested: 6,
                available: 2
            }
        );
    }

    #[test]
    fn addr_of_global_and_deref_store() {
        let (interp, result) = run("ASSIGN x, 1\nADDR_OF p, x\nDEREF_STORE p, 42\nDEREF_LOAD y, p");
        result.unwrap();
        assert_eq!(interp.inspect("x"), Ok(Value::Integer(42)));
        assert_eq!(interp.inspect("y"), Ok(Value::Integer(42)));
    }

    #[test]
    fn addr_of_unknown_name_is_out_of_scope() {
        let (_, result) = run("ADDR_OF p, missing");
        assert_eq!(result.unwrap_err().kind(), "OutOfScope");
    }

    #[test]
    fn deref_of_non_pointer_is_a_type_mismatch() {
        let (_, result) = run("ASSIGN x, 1\nDEREF_LOAD y, x");
        assert_eq!(result.unwrap_err().kind(), "TypeMismatch");
    }
}
