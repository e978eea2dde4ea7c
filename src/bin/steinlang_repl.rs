//! Minimal driver binary.
//!
//! The tokenizer and parser are out of scope for this crate (`spec.md`
//! §1): there is no source-text front end here. This binary instead reads
//! a `postcard`-encoded `Program` from a file (produced by some external
//! AST-building collaborator) and runs it to completion, printing whatever
//! the program's own `print` statements produced.

use std::{env, fs, process::ExitCode};

use steinlang::{Limits, Program, RunOutcome, Session};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: steinlang-repl <program.postcard>");
        return ExitCode::FAILURE;
    };

    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(err) => {
            eprintln!("error reading {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let program: Program = match postcard::from_bytes(&bytes) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("error decoding {path} as a steinlang Program: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = Session::new(program, Limits::default());
    loop {
        match session.run() {
            RunOutcome::Done => break,
            RunOutcome::StepBudgetExhausted => continue,
            RunOutcome::ResourceExceeded(err) => {
                eprintln!("resource limit exceeded: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    for line in session.consume_output() {
        println!("{line}");
    }
    for diag in session.consume_diagnostics() {
        eprintln!("diagnostic: {diag}");
    }

    ExitCode::SUCCESS
}
