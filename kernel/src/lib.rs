//! Process-management core for a single-core teaching kernel
//!
//! # Architecture
//!
//! The core is organized into the following modules:
//! - `objects`: task control blocks and the PID bitmap
//! - `scheduler`: priority run-queues, the decay engine and the dispatcher
//! - `process`: the task registry and the task lifecycle
//! - `platform`: the hardware collaborators the core is driven through
//! - `arch`: the saved register context and CP0 register flags
//!
//! # Scheduling model
//!
//! Tasks live in one of `LEVELS` FIFO ready queues indexed by their dynamic
//! priority (higher index runs first), or in a background slot shared by the
//! idle and init tasks. A bitmap mirrors which levels are non-empty. Each
//! scheduling epoch (quantum exhaustion, block, yield or exit) credits the
//! tasks that waited and debits the task that ran; the accumulated credit
//! moves tasks between levels so CPU-bound work drifts down and starved work
//! drifts up.
//!
//! # Concurrency
//!
//! There is one hardware thread. The timer interrupt can enter the dispatcher
//! at any instruction boundary, so every path that edits the queues outside
//! the interrupt handler runs with interrupts disabled. The embedding kernel
//! owns the single [`ProcessManager`] and must only touch it from the timer
//! handler or from code running with interrupts disabled.

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

extern crate alloc;

pub mod arch;
pub mod config;
pub mod debug;
pub mod error;
pub mod objects;
pub mod platform;
pub mod process;
pub mod scheduler;

pub use arch::{Cause, RegisterContext, Status};
pub use error::{ProcessError, Result};
pub use objects::{KernelStack, Membership, Pid, PidBitmap, Priority, Task, TaskState};
pub use platform::{InterruptHandler, Platform, TaskEntry};
pub use process::ProcessManager;
pub use scheduler::{Dispatch, RunQueueSet};
