//! Task listing
//!
//! `ps` writes one line per registered task, in PID order.

use core::fmt::{self, Write};

use crate::objects::Task;
use crate::platform::Platform;

use super::ProcessManager;

impl<P: Platform> ProcessManager<P> {
    /// Write a table of every task to `out`
    ///
    /// Columns: name, pid, ppid, static and dynamic priority (`-1` for the
    /// background tasks), state and start time.
    pub fn ps(&self, out: &mut impl Write) -> fmt::Result {
        writeln!(
            out,
            "{:<31} {:>4} {:>4} {:>5} {:>5}  {:<8} {}",
            "NAME", "PID", "PPID", "S_PRI", "D_PRI", "STATE", "STARTED"
        )?;
        for task in self.tasks() {
            write_task(out, task)?;
        }
        Ok(())
    }
}

fn write_task(out: &mut impl Write, task: &Task) -> fmt::Result {
    writeln!(
        out,
        "{:<31} {:>4} {:>4} {:>5} {:>5}  {:<8} {}",
        task.name(),
        task.pid(),
        task.ppid(),
        task.static_priority().raw(),
        task.dynamic_priority().raw(),
        task.state(),
        task.start_time()
    )
}
