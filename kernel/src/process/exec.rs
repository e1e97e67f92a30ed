//! Command-line spawn helper
//!
//! `exec("<name> <priority>", entry, wait)` starts a kernel task the way the
//! shell does: the first word names the task, the second is its static
//! priority.

use alloc::string::ToString;

use crate::arch::Word;
use crate::error::{ProcessError, Result};
use crate::objects::Pid;
use crate::platform::{Platform, TaskEntry};

use super::ProcessManager;

/// Split a command line into task name and static priority
///
/// Blanks before and between the two words are skipped; anything after the
/// priority is ignored.
pub fn parse_command(cmdline: &str) -> Result<(&str, i32)> {
    let mut words = cmdline.split(' ').filter(|word| !word.is_empty());

    let name = words
        .next()
        .ok_or_else(|| ProcessError::InvalidCommand("missing task name".to_string()))?;
    let priority = words
        .next()
        .ok_or_else(|| ProcessError::InvalidCommand("missing priority".to_string()))?;
    let priority = priority
        .parse::<i32>()
        .map_err(|_| ProcessError::InvalidCommand(alloc::format!("bad priority {:?}", priority)))?;

    Ok((name, priority))
}

impl<P: Platform> ProcessManager<P> {
    /// Spawn a task from a command line, optionally waiting for it
    ///
    /// The task is created with `argc = 1` and `argv` pointing at its own
    /// name as stored in its control block: a NUL-terminated string of at
    /// most `TASK_NAME_LEN - 1` bytes, cut at any embedded NUL.
    pub fn exec(&mut self, cmdline: &str, entry: TaskEntry, wait: bool) -> Result<Pid> {
        let (name, priority) = parse_command(cmdline).inspect_err(|err| {
            log::warn!("exec {:?}: {}", cmdline, err);
        })?;

        let pid = self.create(name, priority, entry, 1, 0)?;
        let task = self.registry.expect_mut(pid);
        let argv = task.name_with_nul().as_ptr() as Word;
        task.context_mut().a1 = argv;

        log::info!("exec {} as task {} (priority {})", name, pid, priority);
        if wait {
            self.wait_for_child(pid)?;
        }
        Ok(pid)
    }
}
