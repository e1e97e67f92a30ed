//! Integration tests for the process core
//!
//! These tests drive a complete `ProcessManager` on the mock platform
//! through end-to-end scenarios:
//! - Round robin between equal priorities
//! - Starvation avoidance through priority decay
//! - Parent wakeup on child exit
//! - Protected-task and deferred-reclamation rules
//! - The timer interrupt path through a global trampoline

use pcore_kernel::config::{quantum, LEVELS, PID_NUM, TIMER_VECTOR};
use pcore_kernel::platform::mock::{self, MockPlatform};
use pcore_kernel::*;

/// Boot the core: idle running, init created
fn boot() -> ProcessManager<MockPlatform> {
    let mut pm = ProcessManager::new(MockPlatform::new(), mock::noop_handler);
    let init = pm.create("init", 0, mock::entry, 0, 0).expect("init");
    assert_eq!(init, Pid::INIT);
    pm
}

/// Invariants that must hold after every operation
fn assert_consistent(pm: &ProcessManager<MockPlatform>) {
    let queues = pm.run_queues();
    assert!(queues.is_consistent(), "bitmap out of sync: {:?}", queues);

    let running: Vec<Pid> = pm
        .tasks()
        .filter(|task| task.state() == TaskState::Running)
        .map(Task::pid)
        .collect();
    assert_eq!(running, [pm.current()], "exactly one task must be RUNNING");
    assert_eq!(pm.current_task().membership(), Membership::Detached);

    for task in pm.tasks() {
        match task.dynamic_priority() {
            Priority::Level(level) => assert!((level as usize) < LEVELS),
            Priority::Background => assert!(task.pid() == Pid::IDLE || task.pid() == Pid::INIT),
        }
        match task.membership() {
            Membership::Ready(level) => assert!(queues.level(level).contains(task.pid())),
            Membership::Background => assert!(queues.background().contains(task.pid())),
            Membership::Wait => assert!(pm.waiting().contains(task.pid())),
            Membership::Terminal => assert!(pm.terminated().contains(task.pid())),
            Membership::Detached => assert_eq!(task.pid(), pm.current()),
        }
    }
}

/// Tick `n` times, recording who runs after each tick
fn run_ticks(pm: &mut ProcessManager<MockPlatform>, frame: &mut RegisterContext, n: usize) -> Vec<Pid> {
    (0..n)
        .map(|_| {
            pm.tick(frame);
            assert_consistent(pm);
            pm.current()
        })
        .collect()
}

/// Test that two equal-priority tasks alternate, one full quantum each
#[test]
fn test_round_robin_between_equals() {
    let mut pm = boot();
    let a = pm.create("A", 5, mock::entry, 0, 0).unwrap();
    let b = pm.create("B", 5, mock::entry, 0, 0).unwrap();
    let mut frame = RegisterContext::new();

    let history = run_ticks(&mut pm, &mut frame, 60);

    let slice = quantum(5) as usize;
    for (run, chunk) in history.chunks(slice).enumerate() {
        let expected = if run % 2 == 0 { a } else { b };
        assert!(chunk.iter().all(|&pid| pid == expected), "run {}: {:?}", run, chunk);
    }
    assert_eq!(pm.task(a).unwrap().dynamic_priority(), Priority::Level(5));
    assert_eq!(pm.task(b).unwrap().dynamic_priority(), Priority::Level(5));
}

/// Test that a low-priority task is not starved by a CPU-bound higher one
#[test]
fn test_decay_prevents_starvation() {
    let mut pm = boot();
    let h = pm.create("H", 0, mock::entry, 0, 0).unwrap();
    let l = pm.create("L", 10, mock::entry, 0, 0).unwrap();
    let mut frame = RegisterContext::new();

    pm.tick(&mut frame);
    assert_eq!(pm.current(), l);

    let history = run_ticks(&mut pm, &mut frame, 200);
    assert!(history.contains(&h), "level-0 task never ran");

    let mut lowest_seen = LEVELS;
    for _ in 0..200 {
        pm.tick(&mut frame);
        if let Some(level) = pm.task(l).unwrap().dynamic_priority().level() {
            lowest_seen = lowest_seen.min(level);
        }
    }
    assert!(lowest_seen < 10, "CPU-bound task never decayed");
}

/// Test that higher dynamic priority runs first, FIFO among equals
#[test]
fn test_selection_order() {
    let mut pm = boot();
    let first = pm.create("first", 3, mock::entry, 0, 0).unwrap();
    let top = pm.create("top", 20, mock::entry, 0, 0).unwrap();
    let second = pm.create("second", 3, mock::entry, 0, 0).unwrap();
    let mut frame = RegisterContext::new();

    pm.tick(&mut frame);
    assert_eq!(pm.current(), top);
    let level: Vec<Pid> = pm.run_queues().level(3).iter().collect();
    assert_eq!(level, [first, second]);

    pm.kill(first).unwrap();
    pm.kill(second).unwrap();
    assert_consistent(&pm);
    assert_eq!(pm.run_queues().highest_nonempty(), Some(Pid::INIT));
}

/// Test that the parent is woken inside the child's exit
#[test]
fn test_parent_wakes_when_child_exits() {
    let mut pm = boot();
    let parent = pm.create("parent", 8, mock::entry, 0, 0).unwrap();
    let mut frame = RegisterContext::new();
    pm.tick(&mut frame);
    assert_eq!(pm.current(), parent);

    let child = pm.create("child", 2, mock::entry, 0, 0).unwrap();
    pm.wait_for_child(child).unwrap();
    assert_eq!(pm.task(parent).unwrap().state(), TaskState::Waiting { child });
    assert_eq!(pm.current(), child);
    assert_consistent(&pm);

    let resumed = pm.retire_current();
    assert_eq!(pm.current(), parent);
    assert_eq!(resumed, *pm.task(parent).unwrap().context());
    assert_eq!(pm.task(child).unwrap().state(), TaskState::Terminal);
    assert!(pm.waiting().is_empty());
    assert_consistent(&pm);

    // Exit leaves interrupts masked until the platform loads the next task
    assert!(!pm.platform().interrupts_enabled());
    pm.platform_mut().enable_interrupts();

    pm.tick(&mut frame);
    assert!(pm.task(child).is_none());
    assert!(!pm.pids().is_allocated(child));
}

/// Test that idle and init cannot be killed and nothing changes
#[test]
fn test_kill_protected_tasks() {
    let mut pm = boot();
    pm.create("worker", 4, mock::entry, 0, 0).unwrap();

    let bitmap = pm.run_queues().bitmap();
    let background: Vec<Pid> = pm.run_queues().background().iter().collect();

    assert_eq!(pm.kill(Pid::IDLE), Err(ProcessError::ProtectedTask { pid: Pid::IDLE }));
    assert_eq!(pm.kill(Pid::INIT), Err(ProcessError::ProtectedTask { pid: Pid::INIT }));

    assert_eq!(pm.run_queues().bitmap(), bitmap);
    assert_eq!(pm.run_queues().background().iter().collect::<Vec<_>>(), background);
    assert!(pm.terminated().is_empty());
    assert_consistent(&pm);
}

/// Test that a killed task is never selected and its PID is only reused after reclamation
#[test]
fn test_pid_reuse_waits_for_reclamation() {
    let mut pm = boot();
    let mut pids = Vec::new();
    for _ in 2..PID_NUM {
        pids.push(pm.create("filler", 1, mock::entry, 0, 0).unwrap());
    }
    let victim = pids[3];

    pm.kill(victim).unwrap();
    assert_eq!(pm.create("late", 1, mock::entry, 0, 0), Err(ProcessError::PidExhausted));

    let mut frame = RegisterContext::new();
    let history = run_ticks(&mut pm, &mut frame, 50);
    assert!(!history.contains(&victim));
    assert!(!pm.pids().is_allocated(victim));

    assert_eq!(pm.create("late", 1, mock::entry, 0, 0), Ok(victim));
    assert_consistent(&pm);
}

/// Test that a rejected creation leaves no trace
#[test]
fn test_failed_creation_releases_resources() {
    let mut pm = boot();
    pm.platform_mut().set_fail_stack_alloc(true);

    let before = pm.pids().allocated();
    assert_eq!(
        pm.create("task", 3, mock::entry, 0, 0),
        Err(ProcessError::OutOfMemory { requested: config::KERNEL_STACK_SIZE })
    );
    assert_eq!(pm.pids().allocated(), before);
    assert_eq!(pm.run_queues().ready_count(), 0);

    pm.platform_mut().set_fail_stack_alloc(false);
    assert!(pm.create("task", 3, mock::entry, 0, 0).is_ok());
}

/// Test a mixed workload keeps every invariant
#[test]
fn test_mixed_workload_invariants() {
    let mut pm = boot();
    let mut frame = RegisterContext::new();
    let mut spawned = Vec::new();

    for round in 0..40u32 {
        if round % 3 == 0 {
            let level = (round * 7 % LEVELS as u32) as i32;
            spawned.push(pm.create("job", level, mock::entry, 0, 0).unwrap());
        }
        if round % 5 == 4 {
            let victim = spawned.iter().copied().find(|&pid| {
                pid != pm.current() && pm.task(pid).is_some_and(|task| !task.is_terminal())
            });
            if let Some(victim) = victim {
                pm.kill(victim).unwrap();
                assert_consistent(&pm);
            }
        }
        if round % 7 == 6 {
            pm.yield_current();
            assert_consistent(&pm);
        }
        run_ticks(&mut pm, &mut frame, 5);
    }
}

static MANAGER: spin::Mutex<Option<ProcessManager<MockPlatform>>> = spin::Mutex::new(None);

fn timer_trampoline(status: u32, cause: u32, frame: &mut RegisterContext) {
    if let Some(manager) = MANAGER.lock().as_mut() {
        manager.schedule(status, cause, frame);
    }
}

/// Test the timer vector through a global trampoline, as an embedding kernel wires it
#[test]
fn test_timer_interrupt_trampoline() {
    *MANAGER.lock() = Some(ProcessManager::new(MockPlatform::new(), timer_trampoline));
    let worker = {
        let mut guard = MANAGER.lock();
        let pm = guard.as_mut().unwrap();
        pm.create("init", 0, mock::entry, 0, 0).unwrap();
        pm.create("worker", 6, mock::entry, 0, 0).unwrap()
    };

    let handler = MANAGER
        .lock()
        .as_ref()
        .and_then(|pm| pm.platform().handler(TIMER_VECTOR))
        .expect("timer handler installed");

    let mut frame = RegisterContext::new();
    let status = (Status::IE | Status::IM7).bits();
    handler(status, Cause::IP7.bits(), &mut frame);
    handler(status, Cause::IP7.bits(), &mut frame);

    let guard = MANAGER.lock();
    let pm = guard.as_ref().unwrap();
    assert_eq!(pm.current(), worker);
    assert_eq!(frame, *pm.task(worker).unwrap().context());
    assert_eq!(pm.platform().timer_acks(), 2);
    assert_eq!(pm.task(worker).unwrap().counter(), quantum(6) - 1);
}
