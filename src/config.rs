//! Runtime limits and command-line options
//!
//! [`VmConfig`] carries the resource limits the engine enforces.
//! [`Options`] is the parsed command line of the `tacvm` binary.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_HEAP_CELLS: usize = 1 << 20;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;
pub const DEFAULT_HISTORY_LIMIT: usize = 10_000;

/// Resource limits for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Total live heap cells across all blocks.
    pub max_heap_cells: usize,
    /// Maximum number of simultaneously active frames.
    pub max_call_depth: usize,
    /// Instruction budget; `None` runs until halt.
    pub max_steps: Option<u64>,
    /// Snapshots kept for stepping backwards in the debugger.
    pub history_limit: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_heap_cells: DEFAULT_MAX_HEAP_CELLS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_steps: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no input file provided")]
    MissingInput,

    #[error("unexpected extra argument '{0}'")]
    UnexpectedArgument(String),

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("option '{0}' requires a value")]
    MissingValue(String),

    #[error("option '{flag}' expects a positive integer, got '{value}'")]
    InvalidNumber { flag: String, value: String },
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub input: PathBuf,
    pub headless: bool,
    pub timeout: Option<Duration>,
    /// Source lines to stop at in the debugger.
    pub breakpoints: Vec<usize>,
    /// Variables shown in the watch list.
    pub watches: Vec<String>,
    pub vm: VmConfig,
}

impl Options {
    /// Parse arguments, not including the program name.
    pub fn parse<I, S>(args: I) -> Result<Options, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let mut input = None;
        let mut headless = false;
        let mut timeout = None;
        let mut breakpoints = Vec::new();
        let mut watches = Vec::new();
        let mut vm = VmConfig::default();

        while let Some(arg) = args.next() {
            let mut value_for = |flag: &str| args.next().ok_or_else(|| ConfigError::MissingValue(flag.to_string()));
            match arg.as_str() {
                "--headless" => headless = true,
                "--max-steps" => vm.max_steps = Some(number(&arg, value_for(&arg)?)?),
                "--max-depth" => vm.max_call_depth = number(&arg, value_for(&arg)?)?,
                "--heap-cells" => vm.max_heap_cells = number(&arg, value_for(&arg)?)?,
                "--timeout-ms" => {
                    timeout = Some(Duration::from_millis(number(&arg, value_for(&arg)?)?))
                }
                "--break" => breakpoints.push(number(&arg, value_for(&arg)?)?),
                "--watch" => watches.push(value_for(&arg)?),
                flag if flag.starts_with("--") => {
                    return Err(ConfigError::UnknownOption(flag.to_string()))
                }
                _ if input.is_some() => return Err(ConfigError::UnexpectedArgument(arg)),
                _ => input = Some(PathBuf::from(arg)),
            }
        }

        Ok(Options {
            input: input.ok_or(ConfigError::MissingInput)?,
            headless,
            timeout,
            breakpoints,
            watches,
            vm,
        })
    }

    pub fn usage(program_name: &str) -> String {
        format!(
            "Usage: {program_name} <file.tac> [options]\n\
             \n\
             Options:\n\
             \x20 --headless         Run without the debugger UI, printing output to stdout\n\
             \x20 --max-steps N      Stop after N instructions\n\
             \x20 --max-depth N      Maximum call depth (default {DEFAULT_MAX_CALL_DEPTH})\n\
             \x20 --heap-cells N     Heap cell budget (default {DEFAULT_MAX_HEAP_CELLS})\n\
             \x20 --timeout-ms N     Request a halt after N milliseconds (headless)\n\
             \x20 --break LINE       Set a breakpoint on a source line (repeatable)\n\
             \x20 --watch NAME       Watch a variable (repeatable)\n\
             \n\
             Examples:\n\
             \x20 {program_name} demos/factorial.tac\n\
             \x20 {program_name} demos/heap_array.tac --headless"
        )
    }
}

fn number<T: std::str::FromStr + PartialOrd + Default>(flag: &str, value: String) -> Result<T, ConfigError> {
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            flag: flag.to_string(),
            value,
        }),
    }
}
