//! Scheduler - Task Selection & Context Transfer
//!
//! This module implements the dispatcher which manages:
//! - Time-slice accounting on every timer tick
//! - Epoch rebalancing through the decay engine
//! - Selection of the next task from the priority run-queues
//! - Lazy reclamation of terminated tasks
//!
//! ## Architecture
//!
//! The scheduler uses **dynamic-priority preemptive scheduling** with
//! **round-robin** within each priority level:
//!
//! - `LEVELS` priority levels (0 = lowest, `LEVELS - 1` = highest)
//! - O(1) selection via priority bitmap
//! - Quantum grows with the level: `MIN_QUANTUM * (level + 1)`
//! - Idle and init share a background slot, picked only when nothing is ready
//!
//! ## Entry points
//!
//! ```rust,ignore
//! // Timer interrupt: decrement, maybe switch, acknowledge
//! manager.schedule(status, cause, &mut frame);
//!
//! // Same decision without touching the timer
//! manager.tick(&mut frame);
//!
//! // Give up the CPU voluntarily
//! manager.yield_current();
//! ```
//!
//! The dispatcher is not reentrant. It runs inside the timer interrupt or
//! with interrupts disabled.

use crate::arch::RegisterContext;
use crate::ksched_debug;
use crate::objects::{Pid, TaskState};
use crate::platform::Platform;
use crate::process::ProcessManager;

pub mod decay;
pub mod timer;
mod types;

pub use types::{PriorityBitmap, RunQueueSet, TaskQueue};

/// Outcome of one dispatcher invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The interrupted task keeps the CPU; the frame is untouched
    Continue,

    /// The frame now holds `to`'s registers; `from`'s were saved
    Switched { from: Pid, to: Pid },
}

impl<P: Platform> ProcessManager<P> {
    /// Run one scheduling decision against an interrupted register frame
    ///
    /// Reclaims terminated tasks, charges the current task one tick and, once
    /// its quantum is spent (or it is a background task), ends the epoch and
    /// selects the highest-priority ready task. On a switch the frame is
    /// saved into the outgoing task and overwritten with the incoming one.
    pub fn tick(&mut self, frame: &mut RegisterContext) -> Dispatch {
        self.reap_terminated();

        let current = self.registry.expect_mut(self.current);
        if !current.is_background() && !current.tick() {
            return Dispatch::Continue;
        }

        self.preempt_current();
        let next = self.take_next();
        if next == self.current {
            // Alone at the top: keeps running on a refilled quantum
            return Dispatch::Continue;
        }

        let from = self.current;
        let outgoing = self.registry.expect_mut(from);
        *outgoing.context_mut() = *frame;
        outgoing.set_state(TaskState::Ready);

        let incoming = self.registry.expect_mut(next);
        incoming.set_state(TaskState::Running);
        *frame = *incoming.context();
        self.current = next;

        ksched_debug!("switch {} -> {}", from, next);
        Dispatch::Switched { from, to: next }
    }

    /// Voluntarily give up the CPU
    ///
    /// Ends the epoch exactly like quantum exhaustion. If another task is
    /// selected, control transfers to it and this call returns once the
    /// caller is scheduled again.
    pub fn yield_current(&mut self) {
        self.without_interrupts(|manager| {
            manager.preempt_current();
            let next = manager.take_next();
            let from = manager.current;
            if next == from {
                return;
            }

            manager.registry.expect_mut(from).set_state(TaskState::Ready);
            manager.registry.expect_mut(next).set_state(TaskState::Running);
            manager.current = next;

            ksched_debug!("yield {} -> {}", from, next);
            let next_context = *manager.registry.expect(next).context();
            let save_into = manager.registry.expect_mut(from).context_mut();
            manager.platform.switch_blocking(&next_context, save_into);
        });
    }

    /// End the current task's epoch and put it back in a run-queue
    ///
    /// An ordinary task triggers a decay sweep, gets its own priority and
    /// quantum re-derived and goes to the tail of its level. A background
    /// task goes to the tail of the background slot without decay.
    fn preempt_current(&mut self) {
        let pid = self.current;
        if !self.registry.expect(pid).is_background() {
            decay::rebalance(&mut self.registry, &mut self.run_queues, pid);
            decay::rederive(self.registry.expect_mut(pid));
        }
        let task = self.registry.expect_mut(pid);
        self.run_queues.enqueue(task);
    }

    /// Remove and return the task the bitmap scan selects
    ///
    /// May return the current task if it was put back in a queue first.
    ///
    /// # Panics
    ///
    /// If both the ready levels and the background slot are empty.
    fn take_next(&mut self) -> Pid {
        let Some(next) = self.run_queues.highest_nonempty() else {
            panic!("no runnable task: background slot is empty");
        };
        let task = self.registry.expect_mut(next);
        self.run_queues.dequeue(task);
        next
    }

    /// Select the successor of a current task that is leaving the CPU
    ///
    /// # Panics
    ///
    /// If the selection is the current task itself, which is in no ready
    /// queue on the block and exit paths.
    pub(crate) fn take_successor(&mut self) -> Pid {
        let next = self.take_next();
        if next == self.current {
            panic!("task {} selected as its own successor", next);
        }
        next
    }

    /// Reclaim every task waiting in the terminal queue
    ///
    /// Unregisters the task, hands its children to init, drops its stack
    /// and frees its PID. No live task names a freed PID as its parent.
    fn reap_terminated(&mut self) {
        while let Some(pid) = self.terminal_queue.dequeue_head() {
            let Some(task) = self.registry.unregister(pid) else {
                panic!("terminal queue holds unknown task {}", pid);
            };
            if !task.is_terminal() {
                panic!("task {} in terminal queue is {}", pid, task.state());
            }
            for orphan in self.registry.iter_mut().filter(|orphan| orphan.ppid() == pid) {
                orphan.set_ppid(Pid::INIT);
            }
            self.pids.free(pid);
            log::debug!("reclaimed task {} ({})", pid, task.name());
        }
    }
}
