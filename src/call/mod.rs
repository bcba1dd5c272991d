// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The tinyvm Authors

//! Host-to-guest call setup.
//!
//! Everything here builds a call frame in the in-heap program stack and
//! points the program counter at the entry, the same way the `CALL`
//! opcode itself does when the guest calls one of its own functions. The
//! guest's matching `LEAVE` reads the sentinel/return-address pair this
//! module writes and finishes the run.


use crate::heap::MemError;
use crate::vm::{RunOutcome, Status, Vm};

/// Sentinel written as the return address of a host-initiated call.
///
/// `LEAVE` checks for this exact bit pattern to recognize "this frame has
/// no caller to return to" and reports `Finished` instead of resuming at
/// some address.
const NO_CALLER: u32 = 0xFFFF_FFFF;

impl Vm {
    /// Build a call frame at `entry` with room for `nr_args` positional
    /// arguments, without writing them. Used by callers that want to
    /// poke argument slots directly before running.
    pub fn prepare_call(&mut self, entry: usize, nr_args: usize) {
        let frame_bytes = 8 + (nr_args as u32) * 4;
        let frame_psp = (self.heap.len() - 4).saturating_sub(frame_bytes) & !3;
        self.psp = frame_psp;
        let _ = self.heap.store4(frame_psp, NO_CALLER);
        let _ = self.heap.store4(frame_psp + 4, frame_psp);
        #[expect(clippy::cast_possible_truncation, reason = "entry is a code-array index")]
        {
            self.pc = entry as u32;
        }
        self.status = Status::empty();
    }

    /// Call `entry` with each element of `args` in its own argument slot
    /// (the convention the guest's own `CALL`-site code generates), then
    /// run to completion.
    ///
    /// Loops over [`Vm::run_slice`] internally, so any syscalls invoked
    /// along the way that call [`Vm::yield_now`] are simply resumed
    /// immediately; this is a convenience for callers that have no
    /// cooperative scheduling of their own.
    pub fn call(&mut self, entry: usize, args: &[i32]) {
        let (saved_pc, saved_psp, saved_status) = (self.pc, self.psp, self.status);
        self.prepare_call(entry, args.len());
        let base = self.psp + 8;
        for (i, v) in args.iter().enumerate() {
            #[expect(clippy::cast_possible_truncation, reason = "args.len() fits in a frame")]
            let ofs = base + (i as u32) * 4;
            #[expect(clippy::cast_sign_loss, reason = "reinterpreted bit pattern")]
            let _ = self.heap.store4(ofs, *v as u32);
        }
        self.drive_to_completion(saved_pc, saved_psp, saved_status);
    }

    /// Call `entry` with `args` written into the heap as a single array
    /// and a pointer to it passed as the lone argument.
    ///
    /// Useful for entry points with more parameters than the guest's
    /// fixed-slot convention comfortably supports.
    pub fn call_array(&mut self, entry: usize, args: &[i32]) {
        let (saved_pc, saved_psp, saved_status) = (self.pc, self.psp, self.status);

        #[expect(clippy::cast_possible_truncation, reason = "args.len() fits in the heap")]
        let array_bytes = (args.len() as u32) * 4;
        let array_base = (self.heap.len() - 4).saturating_sub(array_bytes) & !3;
        for (i, v) in args.iter().enumerate() {
            #[expect(clippy::cast_possible_truncation, reason = "args.len() fits in the heap")]
            let ofs = array_base + (i as u32) * 4;
            #[expect(clippy::cast_sign_loss, reason = "reinterpreted bit pattern")]
            let _ = self.heap.store4(ofs, *v as u32);
        }
        let frame_psp = array_base.saturating_sub(12) & !3;
        self.psp = frame_psp;
        let _ = self.heap.store4(frame_psp, NO_CALLER);
        let _ = self.heap.store4(frame_psp + 4, frame_psp);
        let _ = self.heap.store4(frame_psp + 8, array_base);
        #[expect(clippy::cast_possible_truncation, reason = "entry is a code-array index")]
        {
            self.pc = entry as u32;
        }
        self.status = Status::empty();
        self.drive_to_completion(saved_pc, saved_psp, saved_status);
    }

    /// Run the frame just set up to completion, then restore whatever
    /// `pc`/`psp`/`status` this VM had before the frame was built.
    ///
    /// A syscall is free to call [`Vm::call`]/[`Vm::call_array`] on the
    /// same `Vm` it was handed: the outer frame it interrupted is left
    /// exactly as it was, so the dispatch loop that's still on the Rust
    /// call stack underneath the syscall resumes correctly once the
    /// syscall returns. A fatal status from the nested run (anything
    /// other than a clean finish) is preserved on top of the restored
    /// status, since it means this `Vm`'s memory may no longer be
    /// trustworthy.
    fn drive_to_completion(&mut self, saved_pc: u32, saved_psp: u32, saved_status: Status) {
        loop {
            match self.run_slice() {
                RunOutcome::Finished | RunOutcome::Error => break,
                RunOutcome::NotFinished => {}
            }
        }
        let nested_status = self.status;
        self.pc = saved_pc;
        self.psp = saved_psp;
        self.status = saved_status;
        if nested_status.is_fatal() {
            self.status |= nested_status;
        }
    }

    /// Read the `i`-th incoming argument of the current frame.
    ///
    /// An out-of-range `i` sets `OUT_OF_BOUNDS` and returns 0.
    #[must_use]
    pub fn arg(&mut self, i: usize) -> i32 {
        #[expect(clippy::cast_possible_truncation, reason = "argument counts are small")]
        let ofs = self.psp + 8 + (i as u32) * 4;
        match self.heap.load4(ofs) {
            Ok(v) => {
                #[expect(clippy::cast_possible_wrap, reason = "reinterpreted bit pattern")]
                {
                    v as i32
                }
            }
            Err(e) => {
                self.status |= match e {
                    MemError::OutOfBounds => Status::OUT_OF_BOUNDS,
                    MemError::Unaligned => Status::UNALIGNED,
                };
                0
            }
        }
    }

    /// Borrow a null-terminated guest string at `addr`.
    pub fn string(&self, addr: u32) -> Result<&[u8], MemError> {
        self.heap.cstr(addr)
    }
}
