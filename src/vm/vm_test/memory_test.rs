// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The tinyvm Authors

//! Heap access opcodes, `LOCAL`/`ARG`, and `BLOCK_COPY`.

use super::{inst, make_vm, run_to_completion};
use crate::bytecode::op;
use crate::vm::{PROGRAM_STACK_SIZE, RunOutcome, Status};

#[test]
fn store_then_load_roundtrips_through_the_heap() {
    let mut vm = make_vm(vec![
        inst(op::CONST, 0x10),   // address
        inst(op::CONST, 0x1234), // value
        inst(op::STORE4, 0),
        inst(op::CONST, 0x10),
        inst(op::LOAD4, 0),
        inst(op::LEAVE, 0),
    ]);
    assert_eq!(run_to_completion(&mut vm), RunOutcome::Finished);
    assert_eq!(vm.pop(), 0x1234);
}

#[test]
fn load1_and_load2_zero_extend() {
    let mut vm = make_vm(vec![
        inst(op::CONST, 0x10),
        inst(op::CONST, 0xFF),
        inst(op::STORE1, 0),
        inst(op::CONST, 0x10),
        inst(op::LOAD1, 0),
        inst(op::LEAVE, 0),
    ]);
    assert_eq!(run_to_completion(&mut vm), RunOutcome::Finished);
    assert_eq!(vm.pop(), 0xFF); // not sign-extended to -1

    let mut vm = make_vm(vec![
        inst(op::CONST, 0x10),
        inst(op::CONST, 0xFFFF),
        inst(op::STORE2, 0),
        inst(op::CONST, 0x10),
        inst(op::LOAD2, 0),
        inst(op::LEAVE, 0),
    ]);
    assert_eq!(run_to_completion(&mut vm), RunOutcome::Finished);
    assert_eq!(vm.pop(), 0xFFFF);
}

/// Spec.md §8 scenario S5: a load at the very first out-of-range address
/// sets `OUT_OF_BOUNDS` and does not finish.
#[test]
fn s5_out_of_bounds_load_sets_status() {
    #[expect(clippy::cast_possible_wrap, reason = "heap_len fits comfortably in an i32")]
    let heap_len = PROGRAM_STACK_SIZE as i32;
    let mut vm = make_vm(vec![inst(op::CONST, heap_len), inst(op::LOAD4, 0), inst(op::LEAVE, 0)]);
    assert_eq!(run_to_completion(&mut vm), RunOutcome::Error);
    assert!(vm.status().contains(Status::OUT_OF_BOUNDS));
}

/// Spec.md §8 scenario S4: a misaligned store sets `UNALIGNED`.
#[test]
fn s4_unaligned_store_sets_status() {
    let mut vm = make_vm(vec![
        inst(op::CONST, 42),
        inst(op::CONST, 1),
        inst(op::STORE4, 0),
        inst(op::LEAVE, 0),
    ]);
    assert_eq!(run_to_completion(&mut vm), RunOutcome::Error);
    assert!(vm.status().contains(Status::UNALIGNED));
}

#[test]
fn byte_stores_have_no_alignment_requirement() {
    let mut vm = make_vm(vec![
        inst(op::CONST, 3),
        inst(op::CONST, 7),
        inst(op::STORE1, 0),
        inst(op::CONST, 3),
        inst(op::LOAD1, 0),
        inst(op::LEAVE, 0),
    ]);
    assert_eq!(run_to_completion(&mut vm), RunOutcome::Finished);
    assert_eq!(vm.pop(), 7);
}

#[test]
fn local_pushes_psp_plus_offset() {
    let mut vm = make_vm(vec![inst(op::LOCAL, 16), inst(op::LEAVE, 0)]);
    vm.prepare_call(0, 0);
    let psp = vm.psp();
    assert_eq!(vm.run_slice(), RunOutcome::Finished);
    #[expect(clippy::cast_possible_wrap, reason = "heap offsets fit comfortably in an i32")]
    let expected = (psp + 16) as i32;
    assert_eq!(vm.pop(), expected);
}

#[test]
fn arg_writes_an_outgoing_argument_slot() {
    let mut vm = make_vm(vec![
        inst(op::CONST, 99),
        inst(op::ARG, 8),
        inst(op::LOCAL, 8),
        inst(op::LOAD4, 0),
        inst(op::LEAVE, 0),
    ]);
    assert_eq!(run_to_completion(&mut vm), RunOutcome::Finished);
    assert_eq!(vm.pop(), 99);
}

#[test]
fn block_copy_moves_len_bytes_from_src_to_dest() {
    // Push order dest, src, len; BLOCK_COPY pops len, src, dest.
    let mut vm = make_vm(vec![
        inst(op::CONST, 0x40), // address to seed
        inst(op::CONST, 0xAB), // value
        inst(op::STORE1, 0),   // store 0xAB at 0x40
        inst(op::CONST, 0x10), // dest
        inst(op::CONST, 0x40), // src
        inst(op::CONST, 1),    // len
        inst(op::BLOCK_COPY, 0),
        inst(op::CONST, 0x10),
        inst(op::LOAD1, 0),
        inst(op::LEAVE, 0),
    ]);
    assert_eq!(run_to_completion(&mut vm), RunOutcome::Finished);
    assert_eq!(vm.pop(), 0xAB);
}

/// Pins the resolution of spec.md's `BLOCK_COPY` ambiguity (DESIGN.md's
/// open-question list): the opcode-length table encodes it as a single
/// byte with no instruction parameter, so `dest`/`src`/`len` all come
/// from the operand stack, not from `instr.param`. A non-zero param is
/// present here and must be ignored; swapping the push order (so the
/// wrong value lands in each role) would copy the wrong bytes, which is
/// what this test actually distinguishes from the happy-path test above.
#[test]
fn block_copy_ignores_instruction_param_and_pops_dest_src_len_in_order() {
    let mut vm = make_vm(vec![
        inst(op::CONST, 0x40), // address to seed
        inst(op::CONST, 0xCD), // value
        inst(op::STORE1, 0),   // store 0xCD at 0x40
        inst(op::CONST, 0x50), // dest
        inst(op::CONST, 0x40), // src
        inst(op::CONST, 1),    // len
        inst(op::BLOCK_COPY, 0x7FFF_FFFF), // param must be ignored
        inst(op::CONST, 0x50),
        inst(op::LOAD1, 0),
        inst(op::LEAVE, 0),
    ]);
    assert_eq!(run_to_completion(&mut vm), RunOutcome::Finished);
    assert_eq!(vm.pop(), 0xCD);
}

#[test]
fn block_copy_out_of_bounds_sets_status() {
    #[expect(clippy::cast_possible_wrap, reason = "heap_len fits comfortably in an i32")]
    let heap_len = PROGRAM_STACK_SIZE as i32;
    let mut vm = make_vm(vec![
        inst(op::CONST, 0),        // dest
        inst(op::CONST, heap_len), // src: one past the end
        inst(op::CONST, 4),        // len
        inst(op::BLOCK_COPY, 0),
        inst(op::LEAVE, 0),
    ]);
    assert_eq!(run_to_completion(&mut vm), RunOutcome::Error);
    assert!(vm.status().contains(Status::OUT_OF_BOUNDS));
}
