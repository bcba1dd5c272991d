// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The tinyvm Authors

//! Human-readable instruction dump, for debugging and `demovm -d`.


use std::fmt::Write as _;

use crate::bytecode::Instruction;
use crate::vm::Vm;

/// Render a decoded instruction sequence, one line per instruction, as
/// `<index>: <mnemonic> [param]`.
#[must_use]
pub fn disassemble(code: &[Instruction]) -> String {
    let mut out = String::new();
    for (i, instr) in code.iter().enumerate() {
        let _ = writeln!(out, "{i:6}: {instr}");
    }
    out
}

impl Vm {
    /// Dump this VM's code section, excluding the trailing `BREAK`
    /// padding added to round the instruction array up to a power of two.
    #[must_use]
    pub fn disassemble(&self) -> String {
        disassemble(&self.code[..self.instr_count])
    }
}
