// Integration tests for the 3AC virtual machine

use std::fs;
use std::path::Path;

use tacvm::config::VmConfig;
use tacvm::interpreter::debugger::{Debugger, RunOutcome};
use tacvm::interpreter::engine::{HaltReason, Interpreter, Status};
use tacvm::interpreter::errors::{AddressError, ExecutionError, RuntimeError};
use tacvm::memory::value::Value;
use tacvm::parser::{load_program, LoadError, Opcode};
use tacvm::sink::Console;

struct Run {
    interpreter: Interpreter,
    console: Console,
    result: Result<HaltReason, ExecutionError>,
}

fn run_with(source: &str, config: VmConfig) -> Run {
    let program = load_program(source).expect("Loading failed");
    let (sink, mut console) = Console::attach();
    let mut interpreter = Interpreter::new(program, sink, config);
    let result = interpreter.run();
    console.drain();
    Run {
        interpreter,
        console,
        result,
    }
}

fn run(source: &str) -> Run {
    run_with(source, VmConfig::default())
}

fn run_demo(name: &str) -> Run {
    let path = Path::new("demos").join(name);
    let source = fs::read_to_string(&path).expect("Failed to read demo file");
    run(&source)
}

fn address_error(result: &Result<HaltReason, ExecutionError>) -> Option<&AddressError> {
    result.as_ref().err().and_then(|e| e.error.as_address())
}

#[test]
fn test_simple_arithmetic() {
    let run = run("ADD x, 5, 10\nMUL y, x, 2\nPRINT y");

    assert_eq!(run.result, Ok(HaltReason::EndOfProgram));
    assert_eq!(run.console.output_lines(), vec!["30"]);
    assert_eq!(run.interpreter.inspect("x"), Ok(Value::Integer(15)));
}

#[test]
fn test_recursive_factorial() {
    let run = run_demo("factorial.tac");

    assert_eq!(run.result, Ok(HaltReason::HaltInstruction));
    assert_eq!(run.console.output_lines(), vec!["120"]);
    assert!(run.interpreter.memory().stack.is_empty());
    assert!(run.interpreter.machine().pending_args.is_empty());
}

#[test]
fn test_swap_demo() {
    let run = run_demo("swap_by_ref.tac");

    assert_eq!(run.result, Ok(HaltReason::HaltInstruction));
    assert_eq!(run.console.output_lines(), vec!["2", "1", "1", "2"]);
}

#[test]
fn test_heap_array_demo() {
    let run = run_demo("heap_array.tac");

    assert_eq!(run.result, Ok(HaltReason::HaltInstruction));
    assert_eq!(run.console.output_lines(), vec!["30", "16"]);
    assert_eq!(run.interpreter.memory().heap.live_blocks(), 0);
    assert_eq!(run.interpreter.memory().heap.blocks().len(), 1);
    assert!(run
        .console
        .log_lines()
        .iter()
        .any(|line| line.starts_with("freed heap block")));
}

#[test]
fn test_strings_demo() {
    let run = run_demo("strings.tac");

    assert_eq!(run.result, Ok(HaltReason::EndOfProgram));
    assert_eq!(
        run.console.output_lines(),
        vec!["Hello, world", "12", "Hd", "true"]
    );
}

#[test]
fn test_pointer_to_local_written_by_callee() {
    // The caller takes the address of its own local and hands the pointer
    // over by reference; the callee writes through it.
    let source = r#"
    CALL outer, 0
    HALT
outer:
    ASSIGN x, 1
    ADDR_OF p, x
    REF_PARAM p
    CALL set, 1
    PRINT x
    RETURN x
set(q):
    DEREF_STORE q, 42
    RETURN
"#;
    let run = run(source);

    assert_eq!(run.result, Ok(HaltReason::HaltInstruction));
    assert_eq!(run.console.output_lines(), vec!["42"]);
    assert_eq!(run.interpreter.inspect("RETVAL"), Ok(Value::Integer(42)));
}

#[test]
fn test_reference_parameter_updates_caller_local() {
    let source = r#"
    CALL outer, 0
    HALT
outer:
    ASSIGN x, 1
    REF_PARAM x
    CALL bump, 1
    PRINT x
    RETURN
bump(v):
    ADD v, v, 10
    ADDR_OF inner, v
    DEREF_STORE inner, v
    RETURN
"#;
    let run = run(source);

    assert_eq!(run.result, Ok(HaltReason::HaltInstruction));
    assert_eq!(run.console.output_lines(), vec!["11"]);
}

#[test]
fn test_lingering_pointer_into_returned_frame() {
    let source = r#"
    CALL leak, 0, p
    DEREF_LOAD v, p
    HALT
leak:
    ASSIGN x, 7
    ADDR_OF q, x
    RETURN q
"#;
    let run = run(source);

    let err = run.result.as_ref().unwrap_err();
    assert_eq!(err.pc, 1);
    assert_eq!(err.opcode, Opcode::DerefLoad);
    assert!(matches!(
        address_error(&run.result),
        Some(AddressError::StaleFrame { .. })
    ));
    assert!(!run.interpreter.memory().globals.contains("v"));
}

#[test]
fn test_stale_pointer_after_frame_slot_reuse() {
    // A second call reuses the freed frame slot; the old pointer must not
    // see the new frame's variable of the same name.
    let source = r#"
    CALL leak, 0, p
    CALL other, 0
    DEREF_LOAD v, p
    HALT
leak:
    ASSIGN x, 7
    ADDR_OF q, x
    RETURN q
other:
    ASSIGN x, 99
    RETURN
"#;
    let run = run(source);

    assert!(matches!(
        address_error(&run.result),
        Some(AddressError::StaleFrame { .. })
    ));
}

#[test]
fn test_heap_use_after_free_error() {
    for access in ["DEREF_LOAD v, p", "INDEX_LOAD v, p, 0", "DEREF_STORE p, 1", "FREE_HEAP p"] {
        let source = format!("ALLOC_HEAP p, 3\nFREE_HEAP p\n{}", access);
        let run = run(&source);

        assert!(
            matches!(
                address_error(&run.result),
                Some(AddressError::UseAfterFree { .. })
            ),
            "{} after free: {:?}",
            access,
            run.result
        );
    }
}

#[test]
fn test_heap_index_store_out_of_bounds() {
    let source = r#"
    ALLOC_HEAP p, 3
    INDEX_STORE p, 0, 10
    INDEX_STORE p, 1, 11
    INDEX_STORE p, 2, 12
    INDEX_STORE p, 3, 13
"#;
    let run = run(source);

    assert_eq!(
        address_error(&run.result),
        Some(&AddressError::IndexOutOfBounds { index: 3, size: 3 })
    );

    let Ok(Value::Pointer(ptr)) = run.interpreter.inspect("p") else {
        panic!("p should hold a pointer");
    };
    let block = run.interpreter.memory().heap.block(&ptr).unwrap();
    assert_eq!(
        block.cells,
        vec![Value::Integer(10), Value::Integer(11), Value::Integer(12)]
    );
}

#[test]
fn test_pointer_arithmetic_bounds() {
    let source = "ALLOC_HEAP p, 2\nADD q, p, 1\nDEREF_STORE q, 5\nINDEX_LOAD v, p, 1\nPRINT v\nSUB r, p, 1\nDEREF_LOAD w, r";
    let run = run(source);

    assert_eq!(run.console.output_lines(), vec!["5"]);
    assert!(matches!(
        address_error(&run.result),
        Some(AddressError::IndexOutOfBounds { index: -1, .. })
    ));
}

#[test]
fn test_conditional_jumps() {
    let source = r#"
    EQ t, 1, 1
    JUMPT t, taken
    PRINT "not taken"
taken:
    NE f, 1, 1
    JUMPF f, also_taken
    PRINT "not taken"
also_taken:
    JUMPT f, never
    PRINT "fell through"
never:
"#;
    let run = run(source);

    assert_eq!(run.result, Ok(HaltReason::EndOfProgram));
    assert_eq!(run.console.output_lines(), vec!["fell through"]);
}

#[test]
fn test_jump_on_non_boolean_is_type_mismatch() {
    for jump in ["JUMPT", "JUMPF"] {
        let source = format!("ASSIGN c, 1\n{} c, end\nend:", jump);
        let run = run(&source);

        let err = run.result.unwrap_err();
        assert!(matches!(err.error, RuntimeError::TypeMismatch { .. }));
        assert_eq!(err.pc, 1);
    }
}

#[test]
fn test_fault_is_logged_and_state_is_kept() {
    let run = run("ASSIGN x, 5\nALLOC_HEAP p, 2\nDIV y, x, 0\nPRINT x");

    let err = run.result.as_ref().unwrap_err();
    assert_eq!(err.error, RuntimeError::DivisionByZero);
    assert_eq!(err.line, 3);
    assert!(matches!(
        run.interpreter.status(),
        Status::Halted(HaltReason::Fault(_))
    ));
    assert_eq!(run.interpreter.pc(), 2);
    assert!(run.console.output_lines().is_empty());
    assert_eq!(
        run.console.log_lines(),
        vec!["DivisionByZero at pc 2 (DIV, line 3): division by zero"]
    );
    assert_eq!(run.interpreter.inspect("x"), Ok(Value::Integer(5)));
    assert_eq!(run.interpreter.memory().heap.live_blocks(), 1);
}

#[test]
fn test_comparisons_require_matching_tags() {
    let run = run("LT c, 1, 2.5");
    assert!(matches!(
        run.result.unwrap_err().error,
        RuntimeError::TypeMismatch { .. }
    ));

    let run = self::run("EQ c, \"1\", 1");
    assert!(matches!(
        run.result.unwrap_err().error,
        RuntimeError::TypeMismatch { .. }
    ));
}

#[test]
fn test_mixed_arithmetic_promotes_to_float() {
    let run = run("ADD x, 1, 0.5\nPRINT x\nDIV y, 7, 2\nPRINT y\nDIV z, 7.0, 2\nPRINT z");

    assert_eq!(run.console.output_lines(), vec!["1.5", "3", "3.5"]);
}

#[test]
fn test_out_of_scope_read() {
    let run = run("PRINT missing");

    assert_eq!(
        address_error(&run.result),
        Some(&AddressError::OutOfScope {
            name: "missing".to_string()
        })
    );
}

#[test]
fn test_deep_recursion_hits_call_depth_limit() {
    let config = VmConfig {
        max_call_depth: 16,
        ..VmConfig::default()
    };
    let run = run_with("loop:\nCALL loop, 0", config);

    assert_eq!(
        run.result.unwrap_err().error,
        RuntimeError::StackOverflow { limit: 16 }
    );
    assert_eq!(run.interpreter.memory().stack.depth(), 16);
}

#[test]
fn test_step_limit() {
    let config = VmConfig {
        max_steps: Some(50),
        ..VmConfig::default()
    };
    let run = run_with("spin:\nJUMP spin", config);

    assert_eq!(
        run.result.unwrap_err().error,
        RuntimeError::StepLimitExceeded { limit: 50 }
    );
    assert_eq!(run.interpreter.machine().steps, 50);
}

#[test]
fn test_host_halt_request() {
    let program = load_program("spin:\nJUMP spin").unwrap();
    let (sink, mut console) = Console::attach();
    let mut interpreter = Interpreter::new(program, sink, VmConfig::default());
    interpreter.halt_handle().request();

    assert_eq!(interpreter.run(), Ok(HaltReason::HostRequest));
    console.drain();
    assert_eq!(console.log_lines().len(), 1);
}

#[test]
fn test_load_errors() {
    assert!(matches!(
        load_program("JUMP nowhere"),
        Err(LoadError::Link { line: 1, .. })
    ));
    assert!(matches!(
        load_program("PRINT 1\nADD x, 1"),
        Err(LoadError::Arity { line: 2, .. })
    ));
    assert!(matches!(
        load_program("FROB x"),
        Err(LoadError::UnknownOpcode { line: 1, .. })
    ));
    assert!(matches!(
        load_program("top:\ntop:"),
        Err(LoadError::DuplicateLabel { line: 2, .. })
    ));
}

#[test]
fn test_debugger_walks_demo_backwards() {
    let source = fs::read_to_string("demos/factorial.tac").unwrap();
    let mut debugger = Debugger::new(load_program(&source).unwrap(), VmConfig::default());

    assert_eq!(debugger.run_to_breakpoint(10_000), Ok(RunOutcome::Halted));
    assert_eq!(debugger.console().output_lines(), vec!["120"]);

    // Back over HALT and PRINT: the output disappears again.
    assert!(debugger.step_backward());
    assert!(debugger.step_backward());
    assert!(debugger.console().output_lines().is_empty());
    assert!(!debugger.interpreter().is_halted());

    debugger.rewind_to_start();
    assert_eq!(debugger.interpreter().pc(), 0);
    assert!(!debugger.can_step_back());
}
