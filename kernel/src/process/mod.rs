//! Process Manager
//!
//! [`ProcessManager`] is the single scheduler context object. It owns the
//! task registry, the run-queue set, the wait and terminal queues, the PID
//! bitmap and the platform, and records which task is running.
//!
//! The dispatcher (`tick`, `yield_current`, `schedule`) lives in
//! [`crate::scheduler`]; the lifecycle operations (`create`, `exit`, `kill`,
//! `wait_for_child`) in [`lifecycle`]; `exec` and `ps` in their own modules.
//!
//! ## Usage
//!
//! ```rust,ignore
//! static MANAGER: spin::Mutex<Option<ProcessManager<Board>>> = spin::Mutex::new(None);
//!
//! fn on_timer(status: u32, cause: u32, frame: &mut RegisterContext) {
//!     if let Some(manager) = MANAGER.lock().as_mut() {
//!         manager.schedule(status, cause, frame);
//!     }
//! }
//!
//! *MANAGER.lock() = Some(ProcessManager::new(Board::new(), on_timer));
//! ```

use crate::config::{TIMER_INTERVAL, TIMER_VECTOR};
use crate::objects::{Pid, PidBitmap, Task, TaskState};
use crate::platform::{InterruptHandler, Platform};
use crate::scheduler::{RunQueueSet, TaskQueue};

pub mod exec;
pub mod lifecycle;
pub mod ps;
mod registry;

pub use registry::TaskRegistry;

/// Scheduler context: every task and every queue, plus the hardware
pub struct ProcessManager<P: Platform> {
    pub(crate) platform: P,
    pub(crate) registry: TaskRegistry,
    pub(crate) run_queues: RunQueueSet,

    /// Tasks blocked on a child
    pub(crate) wait_queue: TaskQueue,

    /// Tasks that exited or were killed, reclaimed on the next tick
    pub(crate) terminal_queue: TaskQueue,

    pub(crate) pids: PidBitmap,

    /// The one RUNNING task; in no queue
    pub(crate) current: Pid,
}

impl<P: Platform> ProcessManager<P> {
    /// Initialize process management
    ///
    /// Creates the idle task (PID 0) as the running task, installs
    /// `timer_handler` on the timer vector and arms the timer. The embedding
    /// kernel creates init next; the first task created receives PID 1.
    pub fn new(mut platform: P, timer_handler: InterruptHandler) -> Self {
        let mut pids = PidBitmap::new();
        let idle_pid = pids.alloc();
        debug_assert_eq!(idle_pid, Some(Pid::IDLE));

        let mut idle = Task::idle(&platform.timestamp());
        idle.set_state(TaskState::Running);

        let mut registry = TaskRegistry::new();
        registry.register(idle);

        platform.register_interrupt_handler(TIMER_VECTOR, timer_handler);
        platform.start_timer(TIMER_INTERVAL);
        log::info!(
            "process manager initialized: idle running, timer on vector {} every {} cycles",
            TIMER_VECTOR,
            TIMER_INTERVAL
        );

        Self {
            platform,
            registry,
            run_queues: RunQueueSet::new(),
            wait_queue: TaskQueue::new(),
            terminal_queue: TaskQueue::new(),
            pids,
            current: Pid::IDLE,
        }
    }

    /// Run `f` with interrupts masked, restoring the previous mask after
    pub fn without_interrupts<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_enabled = self.platform.disable_interrupts();
        let result = f(self);
        if was_enabled {
            self.platform.enable_interrupts();
        }
        result
    }

    /// PID of the running task
    #[inline]
    pub fn current(&self) -> Pid {
        self.current
    }

    /// Control block of the running task
    pub fn current_task(&self) -> &Task {
        self.registry.expect(self.current)
    }

    #[inline]
    pub fn task(&self, pid: Pid) -> Option<&Task> {
        self.registry.find(pid)
    }

    /// Every registered task in PID order, terminated ones included until
    /// they are reclaimed
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.registry.iter()
    }

    #[inline]
    pub fn run_queues(&self) -> &RunQueueSet {
        &self.run_queues
    }

    #[inline]
    pub fn waiting(&self) -> &TaskQueue {
        &self.wait_queue
    }

    #[inline]
    pub fn terminated(&self) -> &TaskQueue {
        &self.terminal_queue
    }

    #[inline]
    pub fn pids(&self) -> &PidBitmap {
        &self.pids
    }

    #[inline]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    #[inline]
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}
