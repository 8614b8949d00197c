//! The `charis` command-line entry point: a REPL when invoked with no
//! arguments, or a file interpreter when given a script path.

use charis::prelude::{InterpretationError, Vm, VmOptions};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// A small dynamically-typed scripting language with a stack-based
/// bytecode virtual machine.
#[derive(Parser, Debug)]
#[command(name = "charis", version, about)]
struct Args {
    /// Script to run. Starts an interactive REPL if omitted.
    path: Option<PathBuf>,

    /// Disassemble compiled bytecode to stdout before running it.
    #[arg(long)]
    print_code: bool,

    /// Trace every instruction and the value stack during execution.
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CHARIS_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let options = VmOptions {
        print_code: args.print_code,
        trace_execution: args.trace,
    };
    let mut vm = Vm::new(options);

    match args.path {
        Some(path) => run_file(&mut vm, &path),
        None => run_repl(&mut vm),
    }
}

/// Reads and interprets a single script file.
///
/// Exit codes follow spec §6: 74 if the file cannot be read, 65 on a
/// compile-time error, 70 on a runtime error, 0 otherwise.
fn run_file(vm: &mut Vm, path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read file \"{}\": {err}", path.display());
            return ExitCode::from(74);
        }
    };

    match vm.interpret(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(InterpretationError::CompileError) => ExitCode::from(65),
        Err(InterpretationError::RuntimeError) => ExitCode::from(70),
    }
}

/// Runs an interactive read-eval-print loop.
///
/// Prompts with `>> `, reads one line at a time, and interprets each line
/// as a standalone program. Typing `exit` or reaching end-of-input quits.
fn run_repl(vm: &mut Vm) -> ExitCode {
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!(">> ");
        if io::stdout().flush().is_err() {
            return ExitCode::SUCCESS;
        }

        line.clear();
        let bytes_read = match stdin.read_line(&mut line) {
            Ok(n) => n,
            Err(_) => return ExitCode::SUCCESS,
        };
        if bytes_read == 0 {
            // EOF.
            println!();
            return ExitCode::SUCCESS;
        }

        let trimmed = line.trim();
        if trimmed == "exit" {
            return ExitCode::SUCCESS;
        }
        if trimmed.is_empty() {
            continue;
        }

        // Errors are reported to stderr by the VM itself; the REPL keeps
        // going regardless of whether the line succeeded.
        let _ = vm.interpret(trimmed);
    }
}
