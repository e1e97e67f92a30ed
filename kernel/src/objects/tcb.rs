//! Task Control Block (TCB) Implementation
//!
//! A TCB holds everything the scheduler knows about one task:
//! - identity (PID, parent PID, address-space id, name)
//! - lifecycle state and remaining time slice
//! - saved register context
//! - static and dynamic priority, sleep credit and the epoch guard
//! - which scheduler queue, if any, currently holds it
//!
//! The task's kernel stack is a separate allocation owned by the TCB. The
//! saved stack pointer of a new task points at the top of it.
//!
//! ## Task Lifecycle
//!
//! ```text
//! Uninit → Ready → Running → Ready     (preempted)
//!                          → Waiting   (blocked on a child) → Ready
//!                          → Terminal  (exit / kill, absorbing)
//! ```

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::arch::{RegisterContext, Word};
use crate::config::{quantum, LEVELS, MAX_QUANTUM, START_TIME_LEN, TASK_NAME_LEN};
use super::Pid;

/// Scheduling priority
///
/// Ordinary tasks sit on one of `LEVELS` levels; a higher level runs first.
/// The idle and init tasks use `Background`, which never decays and always
/// resolves to the background slot of the run-queue set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Background,
    Level(u8),
}

impl Priority {
    /// Convert a numeric priority, `-1` meaning background
    pub fn from_raw(raw: i32) -> Option<Self> {
        if raw == -1 {
            Some(Priority::Background)
        } else if raw >= 0 && (raw as usize) < LEVELS {
            Some(Priority::Level(raw as u8))
        } else {
            None
        }
    }

    /// Numeric form used in diagnostics and in the credit formula
    #[inline]
    pub fn raw(self) -> i32 {
        match self {
            Priority::Background => -1,
            Priority::Level(level) => level as i32,
        }
    }

    /// Ready-queue level, or `None` for background
    #[inline]
    pub fn level(self) -> Option<usize> {
        match self {
            Priority::Background => None,
            Priority::Level(level) => Some(level as usize),
        }
    }

    #[inline]
    pub fn is_background(self) -> bool {
        matches!(self, Priority::Background)
    }

    /// Full time slice for a task at this priority
    #[inline]
    pub fn quantum(self) -> u32 {
        match self {
            Priority::Background => MAX_QUANTUM,
            Priority::Level(level) => quantum(level as usize),
        }
    }
}

/// Task state - lifecycle states of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Control block allocated but not yet schedulable
    Uninit,

    /// Ready to run, sitting in a run-queue
    Ready,

    /// Currently executing on the CPU
    Running,

    /// Blocked until the given child exits
    Waiting {
        /// PID of the child being waited for
        child: Pid,
    },

    /// Finished; storage is reclaimed by the dispatcher's next drain
    Terminal,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskState::Uninit => "UNINIT",
            TaskState::Ready => "READY",
            TaskState::Running => "RUNNING",
            TaskState::Waiting { .. } => "WAIT",
            TaskState::Terminal => "TERMINAL",
        };
        f.pad(label)
    }
}

/// Which scheduler queue currently holds a task
///
/// The slots are mutually exclusive; the running task is `Detached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Detached,
    Ready(usize),
    Background,
    Wait,
    Terminal,
}

/// A task's kernel execution stack
///
/// Backed by `u64` words so the top is 8-byte aligned as the calling
/// convention requires.
pub struct KernelStack {
    words: Box<[u64]>,
}

impl KernelStack {
    /// Allocate a zeroed stack of `size` bytes, or `None` if memory is short
    pub fn try_new(size: usize) -> Option<Self> {
        let len = size / core::mem::size_of::<u64>();
        let mut words = Vec::new();
        words.try_reserve_exact(len).ok()?;
        words.resize(len, 0u64);
        Some(Self {
            words: words.into_boxed_slice(),
        })
    }

    /// Lowest address of the stack
    #[inline]
    pub fn base(&self) -> Word {
        self.words.as_ptr() as Word
    }

    /// Size in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.words.len() * core::mem::size_of::<u64>()
    }

    /// Initial stack pointer: one past the highest address
    #[inline]
    pub fn top(&self) -> Word {
        self.base() + self.size()
    }
}

impl fmt::Debug for KernelStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelStack")
            .field("base", &format_args!("{:#x}", self.base()))
            .field("size", &self.size())
            .finish()
    }
}

/// Task Control Block - one task's identity and scheduling state
pub struct Task {
    pid: Pid,
    ppid: Pid,

    /// Address-space id; equals the PID and is not used for switching
    asid: u32,

    name: String,
    state: TaskState,

    /// Remaining time slice in ticks
    counter: u32,

    start_time: String,

    /// Registers saved while the task is not running
    context: RegisterContext,

    static_priority: Priority,
    dynamic_priority: Priority,

    /// Signed scheduling credit: grows while waiting, shrinks while running
    sleep_avg: i64,

    /// Set once the task's priority was re-derived in the current epoch
    adjusted: bool,

    membership: Membership,

    /// `None` for the idle task, which runs on the boot stack
    stack: Option<KernelStack>,
}

impl Task {
    /// Create the idle task
    ///
    /// Idle runs on the boot stack with whatever registers the boot code
    /// left; its context is filled in the first time it is switched away
    /// from.
    pub fn idle(start_time: &str) -> Self {
        Self {
            pid: Pid::IDLE,
            ppid: Pid::IDLE,
            asid: Pid::IDLE.as_u32(),
            name: c_name("idle"),
            state: TaskState::Uninit,
            counter: MAX_QUANTUM,
            start_time: bounded(String::from(start_time), START_TIME_LEN),
            context: RegisterContext::new(),
            static_priority: Priority::Background,
            dynamic_priority: Priority::Background,
            sleep_avg: 0,
            adjusted: false,
            membership: Membership::Detached,
            stack: None,
        }
    }

    /// Create a task in the `Uninit` state
    ///
    /// The time slice is the full quantum of `priority`; dynamic priority
    /// starts equal to the static one.
    pub fn new(
        pid: Pid,
        ppid: Pid,
        name: &str,
        priority: Priority,
        context: RegisterContext,
        stack: KernelStack,
        start_time: &str,
    ) -> Self {
        Self {
            pid,
            ppid,
            asid: pid.as_u32(),
            name: c_name(name),
            state: TaskState::Uninit,
            counter: priority.quantum(),
            start_time: bounded(String::from(start_time), START_TIME_LEN),
            context,
            static_priority: priority,
            dynamic_priority: priority,
            sleep_avg: 0,
            adjusted: false,
            membership: Membership::Detached,
            stack: Some(stack),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn ppid(&self) -> Pid {
        self.ppid
    }

    /// Re-parent an orphan
    #[inline]
    pub(crate) fn set_ppid(&mut self, ppid: Pid) {
        self.ppid = ppid;
    }

    #[inline]
    pub fn asid(&self) -> u32 {
        self.asid
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.name.strip_suffix('\0').unwrap_or(&self.name)
    }

    /// The name as a NUL-terminated byte string
    ///
    /// This is the buffer `exec` hands to a task as its `argv`.
    #[inline]
    pub fn name_with_nul(&self) -> &[u8] {
        self.name.as_bytes()
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.state
    }

    #[inline]
    pub(crate) fn set_state(&mut self, state: TaskState) {
        self.state = state;
    }

    #[inline]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    #[inline]
    pub(crate) fn set_counter(&mut self, counter: u32) {
        self.counter = counter;
    }

    /// Consume one tick of the time slice
    ///
    /// Returns true if the slice is exhausted. Background tasks never
    /// exhaust their slice.
    #[inline]
    pub(crate) fn tick(&mut self) -> bool {
        if self.is_background() {
            return false;
        }
        self.counter = self.counter.saturating_sub(1);
        self.counter == 0
    }

    #[inline]
    pub fn start_time(&self) -> &str {
        &self.start_time
    }

    #[inline]
    pub fn context(&self) -> &RegisterContext {
        &self.context
    }

    #[inline]
    pub(crate) fn context_mut(&mut self) -> &mut RegisterContext {
        &mut self.context
    }

    #[inline]
    pub fn static_priority(&self) -> Priority {
        self.static_priority
    }

    #[inline]
    pub fn dynamic_priority(&self) -> Priority {
        self.dynamic_priority
    }

    #[inline]
    pub(crate) fn set_dynamic_priority(&mut self, priority: Priority) {
        self.dynamic_priority = priority;
    }

    #[inline]
    pub fn sleep_avg(&self) -> i64 {
        self.sleep_avg
    }

    #[inline]
    pub(crate) fn credit(&mut self, amount: i64) {
        self.sleep_avg += amount;
    }

    #[inline]
    pub fn adjusted(&self) -> bool {
        self.adjusted
    }

    #[inline]
    pub(crate) fn set_adjusted(&mut self, adjusted: bool) {
        self.adjusted = adjusted;
    }

    #[inline]
    pub fn membership(&self) -> Membership {
        self.membership
    }

    #[inline]
    pub(crate) fn set_membership(&mut self, membership: Membership) {
        self.membership = membership;
    }

    #[inline]
    pub fn stack(&self) -> Option<&KernelStack> {
        self.stack.as_ref()
    }

    /// Idle and init: never decremented, never decayed
    #[inline]
    pub fn is_background(&self) -> bool {
        self.dynamic_priority.is_background()
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, TaskState::Terminal)
    }

    /// Whether this task is blocked waiting for `child`
    #[inline]
    pub fn is_waiting_on(&self, child: Pid) -> bool {
        matches!(self.state, TaskState::Waiting { child: awaited } if awaited == child)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("pid", &self.pid)
            .field("ppid", &self.ppid)
            .field("name", &self.name())
            .field("state", &self.state)
            .field("counter", &self.counter)
            .field("static_priority", &self.static_priority.raw())
            .field("dynamic_priority", &self.dynamic_priority.raw())
            .field("sleep_avg", &self.sleep_avg)
            .field("membership", &self.membership)
            .field("pc", &format_args!("{:#x}", self.context.epc))
            .field("sp", &format_args!("{:#x}", self.context.sp))
            .finish()
    }
}

/// Store a task name: cut at the first NUL, bounded, NUL-terminated
fn c_name(name: &str) -> String {
    let name = name.split('\0').next().unwrap_or_default();
    let mut stored = bounded(String::from(name), TASK_NAME_LEN - 1);
    stored.push('\0');
    stored
}

/// Truncate to at most `max` bytes without splitting a character
fn bounded(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
