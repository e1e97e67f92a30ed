//! PID allocation
//!
//! A fixed bitmap of `PID_NUM` identities. PID 0 belongs to the idle task and
//! PID 1 to init; both are handed out in order at boot like any other PID.
//! Allocation resumes after the most recently allocated PID, so a freed PID
//! is not reused until the allocator wraps around.

use core::fmt;

use crate::config::PID_NUM;

const CHUNKS: usize = PID_NUM.div_ceil(64);

/// Task identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(u32);

impl Pid {
    /// The idle task
    pub const IDLE: Pid = Pid(0);

    /// The init task, parent of every task it spawns
    pub const INIT: Pid = Pid(1);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Pid(raw)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Bitmap PID allocator
pub struct PidBitmap {
    chunks: [u64; CHUNKS],
    next: usize,
}

impl PidBitmap {
    pub const fn new() -> Self {
        Self {
            chunks: [0; CHUNKS],
            next: 0,
        }
    }

    /// Check whether a PID is currently handed out
    #[inline]
    pub fn is_allocated(&self, pid: Pid) -> bool {
        let index = pid.index();
        index < PID_NUM && self.chunks[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Allocate the next free PID, or `None` if the space is exhausted
    pub fn alloc(&mut self) -> Option<Pid> {
        for offset in 0..PID_NUM {
            let index = (self.next + offset) % PID_NUM;
            if self.chunks[index / 64] & (1u64 << (index % 64)) == 0 {
                self.chunks[index / 64] |= 1u64 << (index % 64);
                self.next = (index + 1) % PID_NUM;
                return Some(Pid(index as u32));
            }
        }
        None
    }

    /// Release a PID
    ///
    /// Returns false if it was not allocated.
    pub fn free(&mut self, pid: Pid) -> bool {
        if !self.is_allocated(pid) {
            return false;
        }
        let index = pid.index();
        self.chunks[index / 64] &= !(1u64 << (index % 64));
        true
    }

    /// Number of PIDs currently allocated
    pub fn allocated(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.count_ones() as usize).sum()
    }
}

impl Default for PidBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PidBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PidBitmap")
            .field("allocated", &self.allocated())
            .field("next", &self.next)
            .finish()
    }
}
