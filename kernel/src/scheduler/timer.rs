//! Timer-Based Preemption
//!
//! The CP0 compare timer fires on interrupt vector `TIMER_VECTOR` every
//! `TIMER_INTERVAL` cycles. The platform's interrupt entry saves the
//! interrupted registers into a frame and calls the handler registered at
//! boot, which forwards to [`ProcessManager::schedule`].
//!
//! ## Preemption Strategy
//!
//! 1. On timer interrupt, decrement the current task's counter
//! 2. If the counter reaches zero:
//!    - rebalance priorities for the epoch
//!    - switch to the highest-priority ready task
//! 3. Acknowledge the timer so the next compare fires

use crate::arch::{Cause, RegisterContext, Status};
use crate::ksched_debug;
use crate::platform::Platform;
use crate::process::ProcessManager;

use super::Dispatch;

impl<P: Platform> ProcessManager<P> {
    /// Timer interrupt entry
    ///
    /// `status` and `cause` are the raw CP0 registers of the interrupted
    /// context and `frame` its saved registers. Runs one dispatcher decision,
    /// then re-arms the timer.
    pub fn schedule(&mut self, status: u32, cause: u32, frame: &mut RegisterContext) -> Dispatch {
        let status = Status::from_bits_truncate(status);
        let cause = Cause::from_bits_truncate(cause);
        if !cause.is_timer() {
            log::warn!("timer handler entered without IP7 pending (cause {:?})", cause);
        }
        ksched_debug!("timer tick: status {:?} cause {:?}", status, cause);

        let dispatch = self.tick(frame);
        self.platform.ack_timer();
        dispatch
    }
}
