// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The tinyvm Authors

//! Tests for the dispatch loop.

mod memory_test;

use std::sync::Arc;

use super::*;
use crate::bytecode::Instruction;
use crate::env::Environment;
use crate::heap::Heap;

/// Build a `Vm` from raw instructions, padded to a power-of-two code
/// array, with an empty heap of exactly one program stack's worth of
/// room and no registered syscalls.
pub(super) fn make_vm(code: Vec<Instruction>) -> Vm {
    make_vm_with_env(code, Environment::new(0))
}

/// Same as [`make_vm`], but with a caller-supplied syscall environment.
pub(super) fn make_vm_with_env(code: Vec<Instruction>, env: Environment) -> Vm {
    let instr_count = code.len();
    let mut padded = code;
    padded.resize(padded.len().next_power_of_two().max(1), Instruction::BREAK_PAD);
    let heap = Heap::new(PROGRAM_STACK_SIZE);
    Vm::from_parts(Arc::new(env), padded, instr_count, heap, 0, "vm_test".into())
}

pub(super) fn inst(op: u8, param: i32) -> Instruction {
    Instruction { op, param }
}

/// Run `vm` from instruction 0 with no host-level arguments, looping
/// over `run_slice` until it finishes, errors, or yields — a yield is
/// treated as a bug in the test itself (nothing here resumes it) and
/// panics.
pub(super) fn run_to_completion(vm: &mut Vm) -> RunOutcome {
    vm.prepare_call(0, 0);
    loop {
        match vm.run_slice() {
            RunOutcome::NotFinished => panic!("unexpected yield in run_to_completion"),
            outcome => return outcome,
        }
    }
}
