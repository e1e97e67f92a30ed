//! Kernel Object Model
//!
//! The objects the process core manages:
//!
//! - **Task**: task control block, one per task, owned by the registry
//! - **KernelStack**: a task's kernel execution stack, owned by its task
//! - **Pid**: task identity, handed out by the PID bitmap
//!
//! Schedulers and queues never own a task; they hold its [`Pid`] and look
//! the control block up in the registry.

pub mod pid;
pub mod tcb;

// Re-export main types
pub use pid::{Pid, PidBitmap};
pub use tcb::{KernelStack, Membership, Priority, Task, TaskState};
