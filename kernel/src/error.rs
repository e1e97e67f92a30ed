//! Process management errors
//!
//! Rejected requests and caller protocol violations come back as
//! [`ProcessError`]; no scheduler state is changed when one is returned.
//! Broken internal invariants are not errors: they halt the kernel.

use alloc::string::String;
use thiserror::Error;

use crate::objects::Pid;

/// Error types for task lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("static priority {priority} out of range")]
    InvalidPriority { priority: i32 },

    #[error("PID space exhausted")]
    PidExhausted,

    #[error("out of memory for task storage (requested: {requested} bytes)")]
    OutOfMemory { requested: usize },

    #[error("task {pid} is protected")]
    ProtectedTask { pid: Pid },

    #[error("current task cannot kill itself")]
    KillSelf,

    #[error("no live task with pid {pid}")]
    NoSuchTask { pid: Pid },

    #[error("task {pid} is not a child of the caller")]
    NotChild { pid: Pid },

    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

pub type Result<T> = core::result::Result<T, ProcessError>;
