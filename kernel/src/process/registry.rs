//! Task Registry
//!
//! The authoritative set of known tasks. The registry owns every control
//! block; queues refer to tasks by [`Pid`] and look them up here.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;

use crate::objects::{Pid, Task};

/// All tasks, keyed and iterated in ascending PID order
#[derive(Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<Pid, Box<Task>>,
}

impl TaskRegistry {
    pub const fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
        }
    }

    /// Insert a task
    ///
    /// The caller guarantees the PID is not already registered.
    pub(crate) fn register(&mut self, task: Task) {
        let pid = task.pid();
        let previous = self.tasks.insert(pid, Box::new(task));
        debug_assert!(previous.is_none(), "pid {} registered twice", pid);
    }

    /// Remove a task, handing its storage back to the caller
    pub(crate) fn unregister(&mut self, pid: Pid) -> Option<Box<Task>> {
        self.tasks.remove(&pid)
    }

    #[inline]
    pub fn find(&self, pid: Pid) -> Option<&Task> {
        self.tasks.get(&pid).map(|task| &**task)
    }

    #[inline]
    pub(crate) fn find_mut(&mut self, pid: Pid) -> Option<&mut Task> {
        self.tasks.get_mut(&pid).map(|task| &mut **task)
    }

    /// Look up a task the scheduler's own bookkeeping says exists
    ///
    /// # Panics
    ///
    /// If the task is missing; a queue entry without a control block means
    /// the scheduler state is corrupt.
    pub(crate) fn expect(&self, pid: Pid) -> &Task {
        match self.find(pid) {
            Some(task) => task,
            None => panic!("task {} missing from registry", pid),
        }
    }

    /// Mutable form of [`TaskRegistry::expect`]
    pub(crate) fn expect_mut(&mut self, pid: Pid) -> &mut Task {
        match self.find_mut(pid) {
            Some(task) => task,
            None => panic!("task {} missing from registry", pid),
        }
    }

    #[inline]
    pub fn contains(&self, pid: Pid) -> bool {
        self.tasks.contains_key(&pid)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.values().map(|task| &**task)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task> + '_ {
        self.tasks.values_mut().map(|task| &mut **task)
    }
}
