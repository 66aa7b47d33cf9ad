// tacvm: three-address-code VM with a generational memory model and terminal debugger

use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;
use std::thread;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use tacvm::config::Options;
use tacvm::interpreter::debugger::Debugger;
use tacvm::interpreter::engine::{HaltReason, Interpreter};
use tacvm::parser::{load_program, Program};
use tacvm::sink::{EventKind, Sink};
use tacvm::ui::App;

fn main() -> ExitCode {
    let program_name = std::env::args()
        .next()
        .unwrap_or_else(|| "tacvm".to_string());

    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            eprintln!("{}", Options::usage(&program_name));
            return ExitCode::FAILURE;
        }
    };

    let source = match fs::read_to_string(&options.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", options.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let program = match load_program(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Load error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Loaded {}: {} instruction(s), {} label(s).",
        options.input.display(),
        program.len(),
        program.labels().len()
    );

    let result = if options.headless {
        run_headless(program, &options)
    } else {
        run_tui(program, source, &options).map(|()| true)
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run to completion, streaming `PRINT` output to stdout and logs to stderr.
/// Returns whether the run ended without a fault.
fn run_headless(program: Program, options: &Options) -> io::Result<bool> {
    let (sink, receiver) = Sink::channel();
    let mut interpreter = Interpreter::new(program, sink, options.vm.clone());

    let printer = thread::spawn(move || -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for event in receiver {
            match event.kind {
                EventKind::Output => writeln!(out, "{}", event.text)?,
                EventKind::Log => eprintln!("[log] {}", event.text),
            }
        }
        out.flush()
    });

    if let Some(timeout) = options.timeout {
        let halt = interpreter.halt_handle();
        // Detached: if the run finishes first the request is simply never read.
        thread::spawn(move || {
            thread::sleep(timeout);
            halt.request();
        });
    }

    let outcome = interpreter.run();
    let steps = interpreter.machine().steps;
    // Dropping the interpreter closes the channel so the printer can finish.
    drop(interpreter);
    match printer.join() {
        Ok(result) => result?,
        Err(_) => return Err(io::Error::other("output thread panicked")),
    }

    match outcome {
        Ok(HaltReason::HostRequest) => {
            eprintln!("Stopped by timeout after {} instruction(s).", steps);
            Ok(true)
        }
        Ok(_) => {
            eprintln!("Execution completed successfully after {} instruction(s).", steps);
            Ok(true)
        }
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            Ok(false)
        }
    }
}

fn run_tui(program: Program, source: String, options: &Options) -> io::Result<()> {
    let mut debugger = Debugger::new(program, options.vm.clone());
    for &line in &options.breakpoints {
        debugger.toggle_breakpoint(line);
    }
    for name in &options.watches {
        debugger.add_watch(name.clone());
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(debugger, source);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}
