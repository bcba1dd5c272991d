// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The tinyvm Authors

//! An embeddable, stack-based bytecode virtual machine.
//!
//! A [`vm::Vm`] loads a compiled module ([`loader`]), runs it one slice
//! at a time ([`vm::Vm::run_slice`]), and talks to the host exclusively
//! through a negative-indexed syscall table ([`env::Environment`]).
//! Syscalls are ordinary Rust closures; one may suspend the current
//! slice with [`vm::Vm::yield_now`] and resume later, or call back into
//! the guest itself before returning.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tinyvm::{Environment, Vm};
//!
//! let mut env = Environment::new(1);
//! env.register(-1, Box::new(|vm: &mut Vm| {
//!     let n = vm.arg(0);
//!     println!("guest says: {n}");
//! })).unwrap();
//!
//! let mut vm = Vm::load("game.vm", Arc::new(env)).unwrap();
//! vm.call(0, &[]);
//! ```

#![forbid(unsafe_code)]

pub mod bytecode;
mod call;
pub mod disasm;
pub mod env;
pub mod heap;
pub mod loader;
pub mod stack;
pub mod vm;

pub use bytecode::{DecodeError, Instruction};
pub use env::{EnvError, Environment, SyscallFn};
pub use heap::MemError;
pub use loader::LoadError;
pub use stack::StackError;
pub use vm::{PROGRAM_STACK_SIZE, RunOutcome, Status, Vm};
