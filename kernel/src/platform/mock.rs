//! Mock platform
//!
//! Host test double for [`Platform`]. Records what the core asked of the
//! hardware instead of doing it: installed handlers, timer programming,
//! interrupt masking and every blocking context transfer.
//!
//! `switch_blocking` returns immediately, as if the task it switched away
//! from were resumed at once; the caller then finishes its bookkeeping.
//! `switch_out_to` cannot return and panics.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::arch::{RegisterContext, Status, Word};
use crate::objects::KernelStack;

use super::{InterruptHandler, Platform};

/// Global pointer handed to new tasks on the mock platform
pub const MOCK_GP: Word = 0x8000_8000;

/// Entry point for tasks that never really run
pub extern "C" fn entry(_argc: Word, _argv: Word) {}

/// Interrupt handler that does nothing
pub fn noop_handler(_status: u32, _cause: u32, _frame: &mut RegisterContext) {}

/// Recording platform for host tests
pub struct MockPlatform {
    status: Status,
    handlers: Vec<(u32, InterruptHandler)>,
    timer_interval: Option<u32>,
    timer_acks: u32,
    fail_stack_alloc: bool,
    transfers: Vec<RegisterContext>,
}

impl MockPlatform {
    /// A platform that has finished booting: interrupts enabled, no timer
    pub fn new() -> Self {
        Self {
            status: Status::IE | Status::IM7,
            handlers: Vec::new(),
            timer_interval: None,
            timer_acks: 0,
            fail_stack_alloc: false,
            transfers: Vec::new(),
        }
    }

    /// Make every following stack allocation fail (or succeed again)
    pub fn set_fail_stack_alloc(&mut self, fail: bool) {
        self.fail_stack_alloc = fail;
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.status.interrupts_enabled()
    }

    /// Handler installed for `vector`, if any
    pub fn handler(&self, vector: u32) -> Option<InterruptHandler> {
        self.handlers
            .iter()
            .rev()
            .find(|(installed, _)| *installed == vector)
            .map(|(_, handler)| *handler)
    }

    /// Interval the timer was armed with, if it was started
    pub fn timer_interval(&self) -> Option<u32> {
        self.timer_interval
    }

    /// Number of timer interrupts acknowledged so far
    pub fn timer_acks(&self) -> u32 {
        self.timer_acks
    }

    /// Contexts loaded by `switch_blocking`, oldest first
    pub fn transfers(&self) -> &[RegisterContext] {
        &self.transfers
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MockPlatform {
    fn register_interrupt_handler(&mut self, vector: u32, handler: InterruptHandler) {
        self.handlers.push((vector, handler));
    }

    fn enable_interrupts(&mut self) {
        self.status.insert(Status::IE);
    }

    fn disable_interrupts(&mut self) -> bool {
        let was_enabled = self.status.contains(Status::IE);
        self.status.remove(Status::IE);
        was_enabled
    }

    fn start_timer(&mut self, interval: u32) {
        self.timer_interval = Some(interval);
    }

    fn ack_timer(&mut self) {
        self.timer_acks += 1;
    }

    fn alloc_stack(&mut self, size: usize) -> Option<KernelStack> {
        if self.fail_stack_alloc {
            return None;
        }
        KernelStack::try_new(size)
    }

    fn global_pointer(&self) -> Word {
        MOCK_GP
    }

    /// One acknowledged tick counts as one second
    fn timestamp(&self) -> String {
        let seconds = self.timer_acks;
        format!("{:02}:{:02}:{:02}", seconds / 3600, seconds / 60 % 60, seconds % 60)
    }

    fn switch_out_to(&mut self, context: &RegisterContext) -> ! {
        panic!("mock platform cannot leave the caller (switch_out_to {:#x})", context.epc);
    }

    fn switch_blocking(&mut self, next: &RegisterContext, _save_into: &mut RegisterContext) {
        self.transfers.push(*next);
    }
}
