//! Saved Register Context
//!
//! This module defines the register record that holds a task's CPU state
//! while it is not running. The interrupt entry code spills the interrupted
//! task's registers into one of these, and the return path reloads from it.
//!
//! # Layout
//!
//! - `epc`: instruction address execution resumes at
//! - `at`: assembler temporary
//! - `v0`-`v1`: return values
//! - `a0`-`a3`: arguments (a new task receives `argc`/`argv` in `a0`/`a1`)
//! - `t0`-`t9`: temporaries
//! - `s0`-`s7`: callee-saved registers
//! - `hi`/`lo`: multiply/divide results
//! - `gp`, `sp`, `fp`, `ra`: global, stack, frame pointers and return address

use core::fmt;

use static_assertions::const_assert_eq;

/// One machine register
pub type Word = usize;

/// Register context - CPU state of a task that is not running
///
/// Pure value data: copied between the interrupt frame and the task's
/// control block, never shared. DO NOT reorder fields without updating the
/// platform's save/restore routines.
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterContext {
    pub epc: Word,
    pub at: Word,
    pub v0: Word,
    pub v1: Word,
    pub a0: Word,
    pub a1: Word,
    pub a2: Word,
    pub a3: Word,
    pub t0: Word,
    pub t1: Word,
    pub t2: Word,
    pub t3: Word,
    pub t4: Word,
    pub t5: Word,
    pub t6: Word,
    pub t7: Word,
    pub s0: Word,
    pub s1: Word,
    pub s2: Word,
    pub s3: Word,
    pub s4: Word,
    pub s5: Word,
    pub s6: Word,
    pub s7: Word,
    pub t8: Word,
    pub t9: Word,
    pub hi: Word,
    pub lo: Word,
    pub gp: Word,
    pub sp: Word,
    pub fp: Word,
    pub ra: Word,
}

impl RegisterContext {
    /// Create a context with all registers zeroed
    pub const fn new() -> Self {
        Self {
            epc: 0, at: 0, v0: 0, v1: 0, a0: 0, a1: 0, a2: 0, a3: 0,
            t0: 0, t1: 0, t2: 0, t3: 0, t4: 0, t5: 0, t6: 0, t7: 0,
            s0: 0, s1: 0, s2: 0, s3: 0, s4: 0, s5: 0, s6: 0, s7: 0,
            t8: 0, t9: 0, hi: 0, lo: 0, gp: 0, sp: 0, fp: 0, ra: 0,
        }
    }

    /// Context that starts executing `entry(argc, argv)` on a fresh stack
    ///
    /// Every other register is zero, so the task begins directly in its
    /// entry function with nothing to unwind to.
    pub fn for_entry(entry: Word, stack_top: Word, gp: Word, argc: Word, argv: Word) -> Self {
        let mut context = Self::new();
        context.epc = entry;
        context.sp = stack_top;
        context.gp = gp;
        context.a0 = argc;
        context.a1 = argv;
        context
    }

    /// Address execution resumes at
    #[inline]
    pub fn resume_address(&self) -> Word {
        self.epc
    }

    /// Entry arguments `(argc, argv)` as loaded for a new task
    #[inline]
    pub fn entry_args(&self) -> (Word, Word) {
        (self.a0, self.a1)
    }
}

impl fmt::Debug for RegisterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterContext")
            .field("epc", &format_args!("{:#x}", self.epc))
            .field("a0", &format_args!("{:#x}", self.a0))
            .field("a1", &format_args!("{:#x}", self.a1))
            .field("v0", &format_args!("{:#x}", self.v0))
            .field("gp", &format_args!("{:#x}", self.gp))
            .field("sp", &format_args!("{:#x}", self.sp))
            .field("fp", &format_args!("{:#x}", self.fp))
            .field("ra", &format_args!("{:#x}", self.ra))
            .finish()
    }
}

/// Size of the register context in bytes (for the save/restore routines)
pub const CONTEXT_SIZE: usize = core::mem::size_of::<RegisterContext>();

// 32 registers, one word each, no padding
const_assert_eq!(CONTEXT_SIZE, 32 * core::mem::size_of::<Word>());
const_assert_eq!(core::mem::align_of::<RegisterContext>(), core::mem::align_of::<Word>());
