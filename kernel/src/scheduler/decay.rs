//! Decay Engine
//!
//! Once per scheduling epoch every task that waited in a ready queue earns
//! sleep credit and the task that ran pays the same amount. Accumulated
//! credit moves a task up (starved) or down (CPU-bound) the priority levels,
//! and its time slice is refilled to match the new level.

use crate::config::{decay_divisor, quantum, LEVELS, MIN_QUANTUM};
use crate::ksched_debug;
use crate::objects::{Membership, Pid, Priority, Task};
use crate::process::TaskRegistry;

use super::RunQueueSet;

/// Credit moved in one epoch that `runner` ran in
///
/// `(priority + 1) * MIN_QUANTUM`; zero when a background task ran.
#[inline]
pub fn epoch_credit(runner: &Task) -> i64 {
    (runner.dynamic_priority().raw() as i64 + 1) * MIN_QUANTUM as i64
}

/// Run one epoch of credit exchange and priority re-derivation
///
/// `current` is never in a ready queue while this runs. Ready levels are swept
/// from lowest to highest and each is rotated once in FIFO order, so a task
/// that moves up is seen again at its new level but not re-derived twice.
/// The bitmap is rebuilt and the epoch flags cleared before returning.
pub(crate) fn rebalance(registry: &mut TaskRegistry, queues: &mut RunQueueSet, current: Pid) {
    let credit = epoch_credit(registry.expect(current));

    for task in registry.iter_mut() {
        if task.pid() == current {
            if !task.is_background() {
                task.credit(-credit);
            }
        } else if matches!(task.membership(), Membership::Ready(_)) {
            task.credit(credit);
        }
    }

    for level in 0..LEVELS {
        for _ in 0..queues.level(level).len() {
            let Some(pid) = queues.take_head(level) else {
                break;
            };
            let task = registry.expect_mut(pid);
            if !task.adjusted() {
                rederive(task);
                task.set_adjusted(true);
            }
            queues.enqueue(task);
        }
    }
    queues.rebuild();

    for task in registry.iter_mut() {
        task.set_adjusted(false);
    }
}

/// Recompute one task's dynamic priority from its sleep credit
///
/// `new = clamp(old + sleep_avg / (LEVELS * MIN_QUANTUM), 0, LEVELS - 1)`,
/// and the counter is refilled with the new level's quantum. Background
/// tasks are left alone. The task must not be in a queue.
pub(crate) fn rederive(task: &mut Task) {
    let Some(old) = task.dynamic_priority().level() else {
        return;
    };

    let shift = task.sleep_avg() / decay_divisor();
    let new = (old as i64 + shift).clamp(0, LEVELS as i64 - 1) as usize;
    if new != old {
        ksched_debug!("task {}: priority {} -> {}", task.pid(), old, new);
    }

    task.set_dynamic_priority(Priority::Level(new as u8));
    task.set_counter(quantum(new));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::RegisterContext;
    use crate::config::KERNEL_STACK_SIZE;
    use crate::objects::KernelStack;

    fn task(pid: u32, level: u8) -> Task {
        let stack = KernelStack::try_new(KERNEL_STACK_SIZE).unwrap();
        Task::new(Pid::new(pid), Pid::INIT, "t", Priority::Level(level), RegisterContext::new(), stack, "")
    }

    /// Registry with `runner` detached (running) and `others` in ready queues
    fn setup(runner: Task, others: std::vec::Vec<Task>) -> (TaskRegistry, RunQueueSet, Pid) {
        let mut registry = TaskRegistry::new();
        let mut queues = RunQueueSet::new();
        let current = runner.pid();
        registry.register(runner);
        for mut other in others {
            queues.enqueue(&mut other);
            registry.register(other);
        }
        (registry, queues, current)
    }

    #[test]
    fn credit_depends_on_runner_priority() {
        assert_eq!(epoch_credit(&task(2, 0)), 1);
        assert_eq!(epoch_credit(&task(2, 10)), 11);
        assert_eq!(epoch_credit(&Task::idle("")), 0);
    }

    #[test]
    fn credit_flows_from_runner_to_waiters() {
        let (mut registry, mut queues, current) = setup(task(2, 10), vec![task(3, 0), task(4, 31)]);

        rebalance(&mut registry, &mut queues, current);

        assert_eq!(registry.expect(current).sleep_avg(), -11);
        assert_eq!(registry.expect(Pid::new(3)).sleep_avg(), 11);
        assert_eq!(registry.expect(Pid::new(4)).sleep_avg(), 11);
        assert!(queues.is_consistent());
    }

    #[test]
    fn starved_task_climbs_once_credit_accumulates() {
        let (mut registry, mut queues, current) = setup(task(2, 10), vec![task(3, 0)]);

        // 11 credit per epoch; the divisor is 32
        for _ in 0..2 {
            rebalance(&mut registry, &mut queues, current);
        }
        assert_eq!(registry.expect(Pid::new(3)).dynamic_priority(), Priority::Level(0));

        rebalance(&mut registry, &mut queues, current);
        let low = registry.expect(Pid::new(3));
        assert_eq!(low.sleep_avg(), 33);
        assert_eq!(low.dynamic_priority(), Priority::Level(1));
        assert_eq!(low.counter(), quantum(1));
        assert_eq!(low.membership(), Membership::Ready(1));
        assert!(queues.is_consistent());
    }

    #[test]
    fn task_is_rederived_once_per_epoch() {
        // Enough credit to jump several levels in one step
        let mut climber = task(3, 0);
        climber.credit(32 * 5);
        let (mut registry, mut queues, current) = setup(task(2, 0), vec![climber]);

        rebalance(&mut registry, &mut queues, current);

        // credit 1 added: (160 + 1) / 32 = 5
        let climber = registry.expect(Pid::new(3));
        assert_eq!(climber.dynamic_priority(), Priority::Level(5));
        assert!(!climber.adjusted());
    }

    #[test]
    fn rederive_clamps_to_level_range() {
        let mut high = task(2, 30);
        high.credit(32 * 10);
        rederive(&mut high);
        assert_eq!(high.dynamic_priority(), Priority::Level(LEVELS as u8 - 1));

        let mut low = task(3, 2);
        low.credit(-32 * 10);
        rederive(&mut low);
        assert_eq!(low.dynamic_priority(), Priority::Level(0));
        assert_eq!(low.counter(), quantum(0));
    }

    #[test]
    fn rederive_truncates_toward_zero() {
        let mut task = task(2, 5);
        task.credit(-31);
        rederive(&mut task);
        assert_eq!(task.dynamic_priority(), Priority::Level(5));
    }

    #[test]
    fn background_tasks_never_decay() {
        let mut idle = Task::idle("");
        idle.credit(-1000);
        rederive(&mut idle);
        assert_eq!(idle.dynamic_priority(), Priority::Background);
    }

    #[test]
    fn order_within_level_is_preserved() {
        let (mut registry, mut queues, current) =
            setup(task(2, 0), vec![task(3, 4), task(4, 4), task(5, 4)]);

        rebalance(&mut registry, &mut queues, current);

        let order: std::vec::Vec<u32> = queues.level(4).iter().map(Pid::as_u32).collect();
        assert_eq!(order, [3, 4, 5]);
    }
}
