// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The tinyvm Authors

//! Minimal command-line host for running a compiled `.vm` module.
//!
//! Registers a single syscall, `-1` ("print"), that reads a
//! null-terminated string argument out of guest memory and writes it to
//! stdout. Anything more elaborate belongs in a real embedder, not this
//! demo.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use tinyvm::{Environment, Vm};

const USAGE: &str = "usage: demovm [-h] [-d] <file.vm> [entry]";

fn print_syscall(vm: &mut Vm) {
    let addr_arg = vm.arg(0);
    #[expect(clippy::cast_sign_loss, reason = "guest addresses are non-negative by convention")]
    let addr = addr_arg as u32;
    match vm.string(addr) {
        Ok(bytes) => print!("{}", String::from_utf8_lossy(bytes)),
        Err(e) => eprintln!("demovm: print syscall: {e}"),
    }
}

fn run(path: &str, entry: usize, disassemble: bool) -> Result<i32, String> {
    let mut env = Environment::new(1);
    env.register(-1, Box::new(print_syscall))
        .map_err(|e| format!("could not register syscall: {e}"))?;

    let mut vm = Vm::load(path, Arc::new(env)).map_err(|e| format!("{path}: {e}"))?;

    if disassemble {
        print!("{}", vm.disassemble());
        return Ok(0);
    }

    vm.call(entry, &[]);
    if vm.status().contains(tinyvm::Status::FINISHED) {
        Ok(vm.pop())
    } else {
        Err(format!("{path}: aborted with status {}", vm.status()))
    }
}

fn main() -> ExitCode {
    let mut disassemble = false;
    let mut file: Option<String> = None;
    let mut entry = 0usize;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            "-d" | "--disassemble" => disassemble = true,
            other if file.is_none() => file = Some(other.to_owned()),
            other => {
                entry = other.parse().unwrap_or(0);
            }
        }
    }

    let Some(file) = file else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    match run(&file, entry, disassemble) {
        Ok(code) => {
            #[expect(
                clippy::cast_sign_loss,
                clippy::cast_possible_truncation,
                reason = "only the low byte of the guest's return value is an observable exit code"
            )]
            let low_byte = code as u8;
            ExitCode::from(low_byte)
        }
        Err(e) => {
            eprintln!("demovm: {e}");
            ExitCode::FAILURE
        }
    }
}
