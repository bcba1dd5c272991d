// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The tinyvm Authors

//! Module file loader.
//!
//! Reads a compiled `.vm` image (a small header, a code section, a data
//! section, and an implicit zeroed BSS) and turns it into a ready-to-run
//! [`Vm`]. Two header layouts are accepted: the 32-byte v1 header and the
//! 36-byte v2 header, which appends a jump-table-relocation length field
//! this loader doesn't need (the code and data offsets it cares about are
//! unaffected either way).


use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::bytecode::{self, DecodeError, Instruction};
use crate::env::Environment;
use crate::heap::Heap;
use crate::vm::{PROGRAM_STACK_SIZE, Vm};

const MAGIC_V1: i32 = 0x1272_1444;
const MAGIC_V2: i32 = 0x1272_1445;
const HEADER_LEN_V1: usize = 32;
const HEADER_LEN_V2: usize = 36;

/// An error loading a module file.
#[derive(Debug)]
pub enum LoadError {
    /// The file could not be read.
    Io(io::Error),
    /// The file is shorter than a minimal header.
    Truncated,
    /// The first four bytes did not match either known header magic.
    BadMagic,
    /// A header length or offset field is negative or does not fit the
    /// file's actual size.
    InvalidHeader,
    /// The code section failed to decode.
    Decode(DecodeError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "could not read module file: {e}"),
            Self::Truncated => write!(f, "module file is too short to contain a header"),
            Self::BadMagic => write!(f, "module file has an unrecognized header magic"),
            Self::InvalidHeader => write!(f, "module header has an invalid offset or length"),
            Self::Decode(e) => write!(f, "module code section is invalid: {e}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Truncated | Self::BadMagic | Self::InvalidHeader => None,
        }
    }
}

impl From<DecodeError> for LoadError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

struct Header {
    code_offset: u32,
    code_length: u32,
    data_offset: u32,
    data_length: u32,
    lit_length: u32,
    bss_length: u32,
}

fn read_i32(bytes: &[u8], ofs: usize) -> Option<i32> {
    let s = bytes.get(ofs..ofs + 4)?;
    Some(i32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

fn non_negative(v: i32) -> Result<u32, LoadError> {
    u32::try_from(v).map_err(|_| LoadError::InvalidHeader)
}

fn parse_header(bytes: &[u8]) -> Result<Header, LoadError> {
    let magic = read_i32(bytes, 0).ok_or(LoadError::Truncated)?;
    let header_len = match magic {
        MAGIC_V1 => HEADER_LEN_V1,
        MAGIC_V2 => HEADER_LEN_V2,
        _ => return Err(LoadError::BadMagic),
    };
    if bytes.len() < header_len {
        return Err(LoadError::Truncated);
    }
    // instruction_count at offset 4 is informational only; decode() is
    // the source of truth for how many instructions the code section
    // actually holds.
    let code_offset = non_negative(read_i32(bytes, 8).ok_or(LoadError::Truncated)?)?;
    let code_length = non_negative(read_i32(bytes, 12).ok_or(LoadError::Truncated)?)?;
    let data_offset = non_negative(read_i32(bytes, 16).ok_or(LoadError::Truncated)?)?;
    let data_length = non_negative(read_i32(bytes, 20).ok_or(LoadError::Truncated)?)?;
    let lit_length = non_negative(read_i32(bytes, 24).ok_or(LoadError::Truncated)?)?;
    let bss_length = non_negative(read_i32(bytes, 28).ok_or(LoadError::Truncated)?)?;
    if bss_length < PROGRAM_STACK_SIZE {
        return Err(LoadError::InvalidHeader);
    }
    if magic == MAGIC_V2 {
        let jtrg_length = read_i32(bytes, 32).ok_or(LoadError::Truncated)?;
        if jtrg_length < 0 {
            return Err(LoadError::InvalidHeader);
        }
    }
    Ok(Header {
        code_offset,
        code_length,
        data_offset,
        data_length,
        lit_length,
        bss_length,
    })
}

fn slice_of(bytes: &[u8], offset: u32, length: u32) -> Result<&[u8], LoadError> {
    let start = usize::try_from(offset).map_err(|_| LoadError::InvalidHeader)?;
    let len = usize::try_from(length).map_err(|_| LoadError::InvalidHeader)?;
    let end = start.checked_add(len).ok_or(LoadError::InvalidHeader)?;
    bytes.get(start..end).ok_or(LoadError::InvalidHeader)
}

/// Round `n` up to the next power of two (`1` for `n <= 1`).
#[must_use]
pub(crate) const fn roundup_pow2(n: u32) -> u32 {
    if n <= 1 {
        return 1;
    }
    1u32 << (32 - (n - 1).leading_zeros())
}

impl Vm {
    /// Load a compiled module from `path` and attach it to `env`.
    ///
    /// The returned VM is positioned at instruction 0 with an empty
    /// operand stack; call [`Vm::prepare_call`] or [`Vm::call`] to start
    /// executing a specific entry point.
    pub fn load(path: impl AsRef<Path>, env: Arc<Environment>) -> Result<Self, LoadError> {
        let filename = path.as_ref().to_string_lossy().into_owned();
        let bytes = fs::read(path.as_ref()).map_err(LoadError::Io)?;
        let header = parse_header(&bytes)?;

        let code_bytes = slice_of(&bytes, header.code_offset, header.code_length)?;
        let instr_count = bytecode::count_instructions(code_bytes)?;
        let mut code = bytecode::decode(code_bytes)?;
        let raw_len = u32::try_from(code.len()).map_err(|_| LoadError::InvalidHeader)?;
        let padded_len = usize::try_from(roundup_pow2(raw_len)).map_err(|_| LoadError::InvalidHeader)?;
        code.resize(padded_len, Instruction::BREAK_PAD);

        let data_bytes = slice_of(
            &bytes,
            header.data_offset,
            header.data_length.saturating_add(header.lit_length),
        )?;

        let total_len = header
            .data_length
            .saturating_add(header.lit_length)
            .saturating_add(header.bss_length);
        let heap_len = roundup_pow2(total_len);
        let mut heap = Heap::new(heap_len);
        heap.init_data(data_bytes);

        // stack_bottom is derived from heap_len (which may have been
        // padded past total_len by roundup_pow2), not from the header's
        // lengths directly: the program stack always occupies exactly the
        // final PROGRAM_STACK_SIZE bytes of the heap. saturating_sub
        // covers the degenerate case of a minimal module whose data+lit+bss
        // already equals a power of two no bigger than PROGRAM_STACK_SIZE.
        let stack_bottom = (heap_len - 4).saturating_sub(PROGRAM_STACK_SIZE);

        Ok(Self::from_parts(env, code, instr_count, heap, stack_bottom, filename))
    }
}
