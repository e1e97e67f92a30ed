//! Task lifecycle
//!
//! Creation, exit, kill and the parent/child wait protocol.
//!
//! A task leaves the CPU for good through the terminal queue: `exit` and
//! `kill` only mark it TERMINAL and park it there. Its control block, stack
//! and PID are reclaimed by the dispatcher's next tick, never by the path
//! that terminated it (an exiting task is still running on its own stack).

use crate::arch::{RegisterContext, Word};
use crate::config::KERNEL_STACK_SIZE;
use crate::error::{ProcessError, Result};
use crate::objects::{Membership, Pid, Priority, Task, TaskState};
use crate::platform::{Platform, TaskEntry};
use crate::scheduler::decay;

use super::ProcessManager;

impl<P: Platform> ProcessManager<P> {
    /// Create a task that starts at `entry(argc, argv)`
    ///
    /// The new task is a child of the running task and is enqueued READY at
    /// `static_priority`. The task that receives PID 1 becomes init and runs
    /// at background priority whatever was asked for.
    ///
    /// # Errors
    ///
    /// - `InvalidPriority` if `static_priority` is not in `0..LEVELS`
    /// - `PidExhausted` if every PID is in use
    /// - `OutOfMemory` if the platform cannot provide a kernel stack
    ///
    /// Nothing is left allocated on failure.
    pub fn create(
        &mut self,
        name: &str,
        static_priority: i32,
        entry: TaskEntry,
        argc: Word,
        argv: Word,
    ) -> Result<Pid> {
        let priority = match Priority::from_raw(static_priority) {
            Some(priority @ Priority::Level(_)) => priority,
            _ => {
                log::warn!("create {}: static priority {} out of range", name, static_priority);
                return Err(ProcessError::InvalidPriority { priority: static_priority });
            }
        };

        self.without_interrupts(|pm| {
            let Some(pid) = pm.pids.alloc() else {
                log::warn!("create {}: PID space exhausted", name);
                return Err(ProcessError::PidExhausted);
            };

            let Some(stack) = pm.platform.alloc_stack(KERNEL_STACK_SIZE) else {
                pm.pids.free(pid);
                log::warn!("create {}: no memory for kernel stack", name);
                return Err(ProcessError::OutOfMemory { requested: KERNEL_STACK_SIZE });
            };

            let priority = if pid == Pid::INIT { Priority::Background } else { priority };
            let context = RegisterContext::for_entry(
                entry as Word,
                stack.top(),
                pm.platform.global_pointer(),
                argc,
                argv,
            );
            let start_time = pm.platform.timestamp();

            let mut task = Task::new(pid, pm.current, name, priority, context, stack, &start_time);
            task.set_state(TaskState::Ready);
            pm.run_queues.enqueue(&mut task);
            pm.registry.register(task);

            log::debug!("created task {} ({}) at priority {}", pid, name, priority.raw());
            Ok(pid)
        })
    }

    /// Terminate the running task and transfer to its successor
    ///
    /// # Panics
    ///
    /// If called from idle or init.
    pub fn exit(&mut self) -> ! {
        let next = self.retire_current();
        self.platform.switch_out_to(&next)
    }

    /// Bookkeeping half of [`ProcessManager::exit`]
    ///
    /// Marks the running task TERMINAL, wakes a parent waiting on it, runs
    /// the epoch's decay, parks the task in the terminal queue and makes the
    /// successor current. Interrupts stay disabled. Returns the context the
    /// caller must load; the retired task must never run again.
    ///
    /// # Panics
    ///
    /// If called from idle or init.
    pub fn retire_current(&mut self) -> RegisterContext {
        let pid = self.current;
        if pid == Pid::IDLE || pid == Pid::INIT {
            panic!("task {} cannot exit", pid);
        }

        self.platform.disable_interrupts();

        let task = self.registry.expect_mut(pid);
        task.set_state(TaskState::Terminal);
        let ppid = task.ppid();
        self.wakeup_parent(ppid, pid);

        decay::rebalance(&mut self.registry, &mut self.run_queues, pid);

        self.registry.expect_mut(pid).set_membership(Membership::Terminal);
        self.terminal_queue.enqueue(pid);

        let next = self.take_successor();
        let incoming = self.registry.expect_mut(next);
        incoming.set_state(TaskState::Running);
        self.current = next;

        log::debug!("task {} exited, task {} runs", pid, next);
        *incoming.context()
    }

    /// Terminate another task
    ///
    /// The victim is pulled out of whatever queue holds it and parked in the
    /// terminal queue; a parent blocked waiting on it is woken.
    ///
    /// # Errors
    ///
    /// - `ProtectedTask` for idle and init
    /// - `KillSelf` for the running task
    /// - `NoSuchTask` if the PID is not allocated or already TERMINAL
    ///
    /// # Panics
    ///
    /// If the PID is allocated but has no control block.
    pub fn kill(&mut self, pid: Pid) -> Result<()> {
        if pid == Pid::IDLE || pid == Pid::INIT {
            log::warn!("kill {}: task is protected", pid);
            return Err(ProcessError::ProtectedTask { pid });
        }
        if pid == self.current {
            log::warn!("kill {}: task cannot kill itself", pid);
            return Err(ProcessError::KillSelf);
        }

        self.without_interrupts(|pm| {
            if !pm.pids.is_allocated(pid) {
                log::warn!("kill {}: no such task", pid);
                return Err(ProcessError::NoSuchTask { pid });
            }
            let Some(task) = pm.registry.find_mut(pid) else {
                panic!("pid {} allocated but has no task", pid);
            };
            if task.is_terminal() {
                log::warn!("kill {}: already terminated", pid);
                return Err(ProcessError::NoSuchTask { pid });
            }

            match task.membership() {
                Membership::Ready(_) | Membership::Background => {
                    pm.run_queues.dequeue(task);
                }
                Membership::Wait => {
                    pm.wait_queue.remove(pid);
                }
                Membership::Detached | Membership::Terminal => {}
            }
            task.set_state(TaskState::Terminal);
            task.set_membership(Membership::Terminal);
            let ppid = task.ppid();

            pm.terminal_queue.enqueue(pid);
            pm.run_queues.rebuild();
            pm.wakeup_parent(ppid, pid);

            log::info!("killed task {}", pid);
            Ok(())
        })
    }

    /// Block the running task until child `pid` terminates
    ///
    /// Returns at once if `pid` is unknown or already TERMINAL. Otherwise
    /// the caller moves to the wait queue, the epoch's decay runs and control
    /// transfers to the successor; the call returns once the child's exit or
    /// kill has woken the caller and it has been scheduled again.
    ///
    /// The child lookup and the block happen under one interrupt-disabled
    /// section, so the child cannot be reaped in between.
    ///
    /// # Errors
    ///
    /// - `ProtectedTask` if the caller is idle, which must stay runnable
    /// - `NotChild` if `pid` is a live task that is not the caller's child
    pub fn wait_for_child(&mut self, pid: Pid) -> Result<()> {
        self.without_interrupts(|pm| {
            let caller = pm.current;
            if caller == Pid::IDLE {
                log::warn!("wait {}: idle task cannot block", pid);
                return Err(ProcessError::ProtectedTask { pid: caller });
            }

            let Some(child) = pm.registry.find(pid) else {
                return Ok(());
            };
            if child.is_terminal() {
                return Ok(());
            }
            if pid == caller || child.ppid() != caller {
                log::warn!("wait {}: not a child of task {}", pid, caller);
                return Err(ProcessError::NotChild { pid });
            }

            pm.registry
                .expect_mut(caller)
                .set_state(TaskState::Waiting { child: pid });
            decay::rebalance(&mut pm.registry, &mut pm.run_queues, caller);

            pm.registry.expect_mut(caller).set_membership(Membership::Wait);
            pm.wait_queue.enqueue(caller);

            let next = pm.take_successor();
            pm.registry.expect_mut(next).set_state(TaskState::Running);
            pm.current = next;

            log::debug!("task {} waits for {}, task {} runs", caller, pid, next);
            let next_context = *pm.registry.expect(next).context();
            pm.platform
                .switch_blocking(&next_context, pm.registry.expect_mut(caller).context_mut());
            Ok(())
        })
    }

    /// Wake `parent` if it is blocked waiting on `child`
    ///
    /// The parent goes back to the tail of the run-queue its existing
    /// dynamic priority selects.
    pub(crate) fn wakeup_parent(&mut self, parent: Pid, child: Pid) {
        let Some(task) = self.registry.find_mut(parent) else {
            return;
        };
        if !task.is_waiting_on(child) {
            return;
        }

        self.wait_queue.remove(parent);
        task.set_state(TaskState::Ready);
        self.run_queues.enqueue(task);
        log::debug!("task {} woken by exit of {}", parent, child);
    }
}
