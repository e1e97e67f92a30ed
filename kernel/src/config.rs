//! Kernel configuration
//!
//! Compile-time scheduling and resource limits. Cargo features select
//! optional behaviour (`debug-scheduler` tracing, the `mock` platform); the
//! numbers below are fixed for a build.

use static_assertions::const_assert;

/// Number of ready-queue priority levels (0 = lowest, `LEVELS - 1` = highest)
pub const LEVELS: usize = 32;

/// Smallest time slice, in timer ticks
pub const MIN_QUANTUM: u32 = 1;

/// Time slice of the idle and init tasks; they are never decremented
pub const MAX_QUANTUM: u32 = u32::MAX;

/// Size of each task's kernel execution stack in bytes
pub const KERNEL_STACK_SIZE: usize = 4096;

/// Maximum task name length, including the terminator slot
pub const TASK_NAME_LEN: usize = 32;

/// Maximum length of a formatted start timestamp
pub const START_TIME_LEN: usize = 16;

/// Size of the PID space
pub const PID_NUM: usize = 128;

/// Interrupt vector of the CP0 compare timer
pub const TIMER_VECTOR: u32 = 7;

/// Timer compare value programmed at boot (cycles between ticks)
pub const TIMER_INTERVAL: u32 = 10_000_000;

// The priority bitmap is a single u64
const_assert!(LEVELS > 0 && LEVELS <= 64);
const_assert!(KERNEL_STACK_SIZE % core::mem::size_of::<u64>() == 0);
// PID 0 (idle) and PID 1 (init) are reserved
const_assert!(PID_NUM > 2);

/// Time slice granted at a given priority level
///
/// Higher levels get longer slices: `MIN_QUANTUM * (level + 1)`.
#[inline]
pub const fn quantum(level: usize) -> u32 {
    MIN_QUANTUM * (level as u32 + 1)
}

/// Divisor that turns accumulated sleep credit into a level change
#[inline]
pub const fn decay_divisor() -> i64 {
    LEVELS as i64 * MIN_QUANTUM as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantum_grows_with_level() {
        assert_eq!(quantum(0), MIN_QUANTUM);
        assert_eq!(quantum(LEVELS - 1), MIN_QUANTUM * LEVELS as u32);
        for level in 1..LEVELS {
            assert!(quantum(level) > quantum(level - 1));
        }
    }

    #[test]
    fn decay_divisor_matches_levels() {
        assert_eq!(decay_divisor(), 32);
    }
}
