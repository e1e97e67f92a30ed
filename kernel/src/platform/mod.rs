//! Platform trait
//!
//! The hardware collaborators the process core is driven through: interrupt
//! control, the compare timer, stack memory, the global pointer, wall-clock
//! timestamps and the register load/store routines that actually move the
//! CPU from one task to another.
//!
//! A board support crate implements [`Platform`] for its hardware. With the
//! `mock` feature the host test double [`mock::MockPlatform`] is available.

use alloc::string::String;

use crate::arch::{RegisterContext, Word};
use crate::objects::KernelStack;

#[cfg(feature = "mock")]
pub mod mock;

/// Interrupt handler: `(status, cause, frame)`
///
/// Called by the platform's interrupt entry with the raw CP0 registers and
/// the interrupted task's saved registers. Changes to the frame take effect
/// when the interrupt returns.
pub type InterruptHandler = fn(u32, u32, &mut RegisterContext);

/// Task entry point: `entry(argc, argv)`
pub type TaskEntry = extern "C" fn(Word, Word);

/// Hardware services consumed by the process core
pub trait Platform {
    /// Install `handler` for interrupt `vector`
    fn register_interrupt_handler(&mut self, vector: u32, handler: InterruptHandler);

    fn enable_interrupts(&mut self);

    /// Mask interrupts, returning whether they were enabled before
    fn disable_interrupts(&mut self) -> bool;

    /// Arm the compare timer to fire every `interval` cycles
    fn start_timer(&mut self, interval: u32);

    /// Clear the pending timer interrupt and program the next compare
    fn ack_timer(&mut self);

    /// Allocate a kernel stack of `size` bytes
    ///
    /// Returns `None` when memory is short. The default takes the stack from
    /// the kernel heap.
    fn alloc_stack(&mut self, size: usize) -> Option<KernelStack> {
        KernelStack::try_new(size)
    }

    /// Global pointer value new tasks start with
    fn global_pointer(&self) -> Word;

    /// Current wall-clock time, formatted for diagnostics
    fn timestamp(&self) -> String;

    /// Load `context` onto the CPU and never come back
    ///
    /// Used by a task that exits: its own registers are not saved.
    fn switch_out_to(&mut self, context: &RegisterContext) -> !;

    /// Save the running registers into `save_into` and load `next`
    ///
    /// Returns when some later switch loads `save_into` again.
    fn switch_blocking(&mut self, next: &RegisterContext, save_into: &mut RegisterContext);
}
