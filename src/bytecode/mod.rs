// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The tinyvm Authors

//! Decoded instruction format for the tinyvm opcode set.
//!
//! The on-disk code section is a stream of variable-length opcodes (1, 2,
//! or 5 bytes). The loader decodes that stream once, up front, into a
//! uniform `(op, param)` array so the dispatch loop never has to deal with
//! variable-width decoding on the hot path.


use std::fmt;

/// Opcode constants (0x00-0x3B), one per instruction kind. See the
/// per-constant docs below for the semantics of each.
pub mod op {
    /// No-op.
    pub const UNDEF: u8 = 0x00;
    /// No-op.
    pub const IGNORE: u8 = 0x01;
    /// Trap to the debugger callback.
    pub const BREAK: u8 = 0x02;
    /// Allocate a local frame: `psp -= param`.
    pub const ENTER: u8 = 0x03;
    /// Release a local frame and return, or finish if the saved PC is -1.
    pub const LEAVE: u8 = 0x04;
    /// Call a function address or syscall popped off the operand stack.
    pub const CALL: u8 = 0x05;
    /// Push 0.
    pub const PUSH: u8 = 0x06;
    /// Discard the top of the operand stack.
    pub const POP: u8 = 0x07;
    /// Push an immediate.
    pub const CONST: u8 = 0x08;
    /// Push `psp + param`.
    pub const LOCAL: u8 = 0x09;
    /// Jump to the address popped off the operand stack.
    pub const JUMP: u8 = 0x0A;

    /// Integer branch: `b == a`.
    pub const EQ: u8 = 0x0B;
    /// Integer branch: `b != a`.
    pub const NE: u8 = 0x0C;
    /// Signed integer branch: `b < a`.
    pub const LTI: u8 = 0x0D;
    /// Signed integer branch: `b <= a`.
    pub const LEI: u8 = 0x0E;
    /// Signed integer branch: `b > a`.
    pub const GTI: u8 = 0x0F;
    /// Signed integer branch: `b >= a`.
    pub const GEI: u8 = 0x10;
    /// Unsigned integer branch: `b < a`.
    pub const LTU: u8 = 0x11;
    /// Unsigned integer branch: `b <= a`.
    pub const LEU: u8 = 0x12;
    /// Unsigned integer branch: `b > a`.
    pub const GTU: u8 = 0x13;
    /// Unsigned integer branch: `b >= a`.
    pub const GEU: u8 = 0x14;

    /// Float branch: `b == a`.
    pub const EQF: u8 = 0x15;
    /// Float branch: `b != a`.
    pub const NEF: u8 = 0x16;
    /// Float branch: `b < a`.
    pub const LTF: u8 = 0x17;
    /// Float branch: `b <= a`.
    pub const LEF: u8 = 0x18;
    /// Float branch: `b > a`.
    pub const GTF: u8 = 0x19;
    /// Float branch: `b >= a`.
    pub const GEF: u8 = 0x1A;

    /// Load a zero-extended byte.
    pub const LOAD1: u8 = 0x1B;
    /// Load a zero-extended half-word.
    pub const LOAD2: u8 = 0x1C;
    /// Load a word.
    pub const LOAD4: u8 = 0x1D;
    /// Store a byte.
    pub const STORE1: u8 = 0x1E;
    /// Store a half-word.
    pub const STORE2: u8 = 0x1F;
    /// Store a word.
    pub const STORE4: u8 = 0x20;
    /// Write an outgoing call argument: `[psp + param] := pop()`.
    pub const ARG: u8 = 0x21;
    /// Bounds-checked `memmove`-style heap copy.
    pub const BLOCK_COPY: u8 = 0x22;

    /// Sign-extend the low 8 bits of the top of stack.
    pub const SEX8: u8 = 0x23;
    /// Sign-extend the low 16 bits of the top of stack.
    pub const SEX16: u8 = 0x24;

    /// Integer negate.
    pub const NEGI: u8 = 0x25;
    /// Integer add.
    pub const ADD: u8 = 0x26;
    /// Integer subtract.
    pub const SUB: u8 = 0x27;
    /// Signed integer divide.
    pub const DIVI: u8 = 0x28;
    /// Unsigned integer divide.
    pub const DIVU: u8 = 0x29;
    /// Signed integer modulo.
    pub const MODI: u8 = 0x2A;
    /// Unsigned integer modulo.
    pub const MODU: u8 = 0x2B;
    /// Signed integer multiply (wraps identically to unsigned).
    pub const MULI: u8 = 0x2C;
    /// Unsigned integer multiply.
    pub const MULU: u8 = 0x2D;

    /// Bitwise AND.
    pub const BAND: u8 = 0x2E;
    /// Bitwise OR.
    pub const BOR: u8 = 0x2F;
    /// Bitwise XOR.
    pub const BXOR: u8 = 0x30;
    /// Bitwise complement (unary).
    pub const BCOM: u8 = 0x31;

    /// Logical shift left.
    pub const LSH: u8 = 0x32;
    /// Arithmetic shift right.
    pub const RSHI: u8 = 0x33;
    /// Logical shift right.
    pub const RSHU: u8 = 0x34;

    /// Float negate.
    pub const NEGF: u8 = 0x35;
    /// Float add.
    pub const ADDF: u8 = 0x36;
    /// Float subtract.
    pub const SUBF: u8 = 0x37;
    /// Float divide.
    pub const DIVF: u8 = 0x38;
    /// Float multiply.
    pub const MULF: u8 = 0x39;

    /// Convert integer to float.
    pub const CVIF: u8 = 0x3A;
    /// Convert float to integer (truncating).
    pub const CVFI: u8 = 0x3B;

    /// Highest legal opcode byte.
    pub const MAX: u8 = CVFI;
}

/// Mnemonic for an opcode byte, used by the disassembler and error messages.
#[must_use]
pub fn mnemonic(opcode: u8) -> &'static str {
    match opcode {
        op::UNDEF => "UNDEF",
        op::IGNORE => "IGNORE",
        op::BREAK => "BREAK",
        op::ENTER => "ENTER",
        op::LEAVE => "LEAVE",
        op::CALL => "CALL",
        op::PUSH => "PUSH",
        op::POP => "POP",
        op::CONST => "CONST",
        op::LOCAL => "LOCAL",
        op::JUMP => "JUMP",
        op::EQ => "EQ",
        op::NE => "NE",
        op::LTI => "LTI",
        op::LEI => "LEI",
        op::GTI => "GTI",
        op::GEI => "GEI",
        op::LTU => "LTU",
        op::LEU => "LEU",
        op::GTU => "GTU",
        op::GEU => "GEU",
        op::EQF => "EQF",
        op::NEF => "NEF",
        op::LTF => "LTF",
        op::LEF => "LEF",
        op::GTF => "GTF",
        op::GEF => "GEF",
        op::LOAD1 => "LOAD1",
        op::LOAD2 => "LOAD2",
        op::LOAD4 => "LOAD4",
        op::STORE1 => "STORE1",
        op::STORE2 => "STORE2",
        op::STORE4 => "STORE4",
        op::ARG => "ARG",
        op::BLOCK_COPY => "BLOCK_COPY",
        op::SEX8 => "SEX8",
        op::SEX16 => "SEX16",
        op::NEGI => "NEGI",
        op::ADD => "ADD",
        op::SUB => "SUB",
        op::DIVI => "DIVI",
        op::DIVU => "DIVU",
        op::MODI => "MODI",
        op::MODU => "MODU",
        op::MULI => "MULI",
        op::MULU => "MULU",
        op::BAND => "BAND",
        op::BOR => "BOR",
        op::BXOR => "BXOR",
        op::BCOM => "BCOM",
        op::LSH => "LSH",
        op::RSHI => "RSHI",
        op::RSHU => "RSHU",
        op::NEGF => "NEGF",
        op::ADDF => "ADDF",
        op::SUBF => "SUBF",
        op::DIVF => "DIVF",
        op::MULF => "MULF",
        op::CVIF => "CVIF",
        op::CVFI => "CVFI",
        _ => "???",
    }
}

/// Width in bytes of an encoded instruction (opcode byte included).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    /// Opcode byte only.
    One,
    /// Opcode byte plus an 8-bit parameter (`ARG`).
    Two,
    /// Opcode byte plus a 32-bit little-endian signed parameter.
    Five,
}

impl Width {
    /// Number of bytes this width occupies in the code stream.
    #[must_use]
    pub const fn len(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Five => 5,
        }
    }
}

/// Look up the encoded width of an opcode byte.
///
/// Returns `None` for any byte that isn't one of the 60 legal opcodes.
#[must_use]
pub const fn opcode_width(opcode: u8) -> Option<Width> {
    match opcode {
        0x00..=0x02 | 0x05..=0x07 | 0x0A | 0x1B..=0x20 | 0x22..=0x3B => Some(Width::One),
        0x21 => Some(Width::Two),
        0x03..=0x04 | 0x08..=0x09 | 0x0B..=0x1A => Some(Width::Five),
        _ => None,
    }
}

/// A decoded `(op, param)` instruction.
///
/// `param` is 0 for single-byte opcodes. For `ARG` it holds the 8-bit
/// operand zero-extended to 32 bits; for every 5-byte opcode it holds the
/// full signed 32-bit little-endian parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// The opcode byte.
    pub op: u8,
    /// The instruction's parameter, or 0 if the opcode takes none.
    pub param: i32,
}

impl Instruction {
    /// A `BREAK` instruction with no parameter.
    ///
    /// Used to pad the decoded instruction array out to a power of two so
    /// that out-of-range-but-in-mask program-counter values trap
    /// deterministically instead of reading uninitialized memory.
    pub const BREAK_PAD: Self = Self {
        op: op::BREAK,
        param: 0,
    };
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match opcode_width(self.op) {
            Some(Width::One) => write!(f, "{}", mnemonic(self.op)),
            _ => write!(f, "{} {}", mnemonic(self.op), self.param),
        }
    }
}

/// An error decoding the code section of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// A byte in the code stream did not match any of the 60 legal opcodes.
    IllegalOpcode { offset: usize, byte: u8 },
    /// The code stream ended in the middle of a multi-byte instruction.
    Truncated { offset: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::IllegalOpcode { offset, byte } => {
                write!(f, "illegal opcode {byte:#04x} at code offset {offset}")
            }
            Self::Truncated { offset } => {
                write!(f, "truncated instruction at code offset {offset}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode a code section into a sequence of `(op, param)` instructions.
///
/// This is the only place that deals with the variable-width encoding;
/// everything downstream operates on the returned `Vec<Instruction>`.
pub fn decode(code: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < code.len() {
        let byte = code[pos];
        let width = opcode_width(byte).ok_or(DecodeError::IllegalOpcode { offset: pos, byte })?;
        let param = match width {
            Width::One => 0,
            Width::Two => {
                let raw = *code
                    .get(pos + 1)
                    .ok_or(DecodeError::Truncated { offset: pos })?;
                i32::from(raw)
            }
            Width::Five => {
                let s = code
                    .get(pos + 1..pos + 5)
                    .ok_or(DecodeError::Truncated { offset: pos })?;
                i32::from_le_bytes([s[0], s[1], s[2], s[3]])
            }
        };
        out.push(Instruction { op: byte, param });
        pos += width.len();
    }
    Ok(out)
}

/// Count the instructions a code section decodes to, without allocating
/// the intermediate `Vec`.
pub fn count_instructions(code: &[u8]) -> Result<usize, DecodeError> {
    let mut count = 0usize;
    let mut pos = 0usize;
    while pos < code.len() {
        let byte = code[pos];
        let width = opcode_width(byte).ok_or(DecodeError::IllegalOpcode { offset: pos, byte })?;
        if pos + width.len() > code.len() {
            return Err(DecodeError::Truncated { offset: pos });
        }
        pos += width.len();
        count += 1;
    }
    Ok(count)
}

/// Re-encode a decoded instruction sequence back into a code byte stream.
///
/// Used by the round-trip decode property test; the interpreter never
/// calls this.
#[must_use]
pub fn encode(instructions: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::new();
    for instr in instructions {
        out.push(instr.op);
        match opcode_width(instr.op) {
            Some(Width::One) | None => {}
            Some(Width::Two) => {
                #[expect(
                    clippy::cast_sign_loss,
                    clippy::cast_possible_truncation,
                    reason = "ARG's param is always the zero-extended 8-bit operand"
                )]
                out.push(instr.param as u8);
            }
            Some(Width::Five) => out.extend_from_slice(&instr.param.to_le_bytes()),
        }
    }
    out
}
