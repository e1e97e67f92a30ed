//! Scheduler Types
//!
//! Core data structures for the run-queues.

use alloc::collections::VecDeque;
use core::fmt;

use crate::config::LEVELS;
use crate::objects::{Membership, Pid, Task};

/// Priority bitmap for O(1) lookup
///
/// Bit `i` is set iff ready level `i` holds at least one task. The background
/// slot has no bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityBitmap {
    bits: u64,
}

impl PriorityBitmap {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    #[inline]
    pub fn set(&mut self, level: usize) {
        self.bits |= 1u64 << level;
    }

    #[inline]
    pub fn clear(&mut self, level: usize) {
        self.bits &= !(1u64 << level);
    }

    #[inline]
    pub fn is_set(&self, level: usize) -> bool {
        self.bits & (1u64 << level) != 0
    }

    /// Highest level with its bit set
    #[inline]
    pub fn highest(&self) -> Option<usize> {
        if self.bits == 0 {
            None
        } else {
            Some(63 - self.bits.leading_zeros() as usize)
        }
    }

    #[inline]
    pub fn bits(&self) -> u64 {
        self.bits
    }

    #[inline]
    fn reset(&mut self) {
        self.bits = 0;
    }
}

/// Task queue - FIFO of task identities
///
/// Tasks are added to the tail and taken from the head, which gives
/// round-robin order within one priority level. Used for every ready level,
/// the background slot, the wait queue and the terminal queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
    pids: VecDeque<Pid>,
}

impl TaskQueue {
    /// Create an empty task queue
    pub const fn new() -> Self {
        Self {
            pids: VecDeque::new(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pids.len()
    }

    /// First task in arrival order
    #[inline]
    pub fn head(&self) -> Option<Pid> {
        self.pids.front().copied()
    }

    #[inline]
    pub fn contains(&self, pid: Pid) -> bool {
        self.pids.contains(&pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        self.pids.iter().copied()
    }

    /// Add task to tail of queue
    #[inline]
    pub(crate) fn enqueue(&mut self, pid: Pid) {
        self.pids.push_back(pid);
    }

    /// Remove task from queue, preserving the order of the rest
    pub(crate) fn remove(&mut self, pid: Pid) -> bool {
        match self.pids.iter().position(|&queued| queued == pid) {
            Some(index) => {
                self.pids.remove(index);
                true
            }
            None => false,
        }
    }

    /// Dequeue from head
    #[inline]
    pub(crate) fn dequeue_head(&mut self) -> Option<Pid> {
        self.pids.pop_front()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.pids.iter()).finish()
    }
}

/// Run-queue set - per-level ready queues plus the background slot
///
/// Level 0 is the lowest priority and `LEVELS - 1` the highest. A task's
/// [`Membership`] always names the queue that holds it, so removal never
/// has to search more than one queue.
pub struct RunQueueSet {
    /// Ready queues per priority level
    levels: [TaskQueue; LEVELS],

    /// Idle and init
    background: TaskQueue,

    bitmap: PriorityBitmap,
}

impl RunQueueSet {
    pub fn new() -> Self {
        Self {
            levels: core::array::from_fn(|_| TaskQueue::new()),
            background: TaskQueue::new(),
            bitmap: PriorityBitmap::new(),
        }
    }

    /// Add task to the tail of the queue its dynamic priority selects
    pub fn enqueue(&mut self, task: &mut Task) {
        match task.dynamic_priority().level() {
            Some(level) => {
                self.levels[level].enqueue(task.pid());
                self.bitmap.set(level);
                task.set_membership(Membership::Ready(level));
            }
            None => {
                self.background.enqueue(task.pid());
                task.set_membership(Membership::Background);
            }
        }
    }

    /// Remove task from whichever run-queue holds it
    ///
    /// Returns false, and changes nothing, if the task is not in a run-queue.
    pub fn dequeue(&mut self, task: &mut Task) -> bool {
        let removed = match task.membership() {
            Membership::Ready(level) => {
                let removed = self.levels[level].remove(task.pid());
                if self.levels[level].is_empty() {
                    self.bitmap.clear(level);
                }
                removed
            }
            Membership::Background => self.background.remove(task.pid()),
            _ => return false,
        };
        task.set_membership(Membership::Detached);
        removed
    }

    /// Head of the highest non-empty level, else head of the background slot
    pub fn highest_nonempty(&self) -> Option<Pid> {
        match self.bitmap.highest() {
            Some(level) => self.levels[level].head(),
            None => self.background.head(),
        }
    }

    /// Recompute the bitmap from the queues
    pub fn rebuild(&mut self) {
        self.bitmap.reset();
        for (level, queue) in self.levels.iter().enumerate() {
            if !queue.is_empty() {
                self.bitmap.set(level);
            }
        }
    }

    /// Take the head of one level without touching the bitmap
    ///
    /// The caller must re-enqueue the task (which fixes its membership) and
    /// rebuild the bitmap once the batch is done.
    pub(crate) fn take_head(&mut self, level: usize) -> Option<Pid> {
        self.levels[level].dequeue_head()
    }

    #[inline]
    pub fn level(&self, level: usize) -> &TaskQueue {
        &self.levels[level]
    }

    #[inline]
    pub fn background(&self) -> &TaskQueue {
        &self.background
    }

    #[inline]
    pub fn bitmap(&self) -> PriorityBitmap {
        self.bitmap
    }

    /// Number of tasks in the ready levels (background slot excluded)
    pub fn ready_count(&self) -> usize {
        self.levels.iter().map(TaskQueue::len).sum()
    }

    /// Whether every bitmap bit matches the emptiness of its level
    pub fn is_consistent(&self) -> bool {
        self.levels
            .iter()
            .enumerate()
            .all(|(level, queue)| self.bitmap.is_set(level) == !queue.is_empty())
    }
}

impl Default for RunQueueSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunQueueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (level, queue) in self.levels.iter().enumerate().rev() {
            if !queue.is_empty() {
                map.entry(&level, queue);
            }
        }
        map.entry(&"background", &self.background);
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::RegisterContext;
    use crate::config::KERNEL_STACK_SIZE;
    use crate::objects::{KernelStack, Priority};

    fn task(pid: u32, priority: Priority) -> Task {
        let stack = KernelStack::try_new(KERNEL_STACK_SIZE).unwrap();
        Task::new(Pid::new(pid), Pid::INIT, "t", priority, RegisterContext::new(), stack, "")
    }

    #[test]
    fn bitmap_tracks_highest_level() {
        let mut bitmap = PriorityBitmap::new();
        assert_eq!(bitmap.highest(), None);

        bitmap.set(3);
        bitmap.set(17);
        assert_eq!(bitmap.highest(), Some(17));

        bitmap.clear(17);
        assert_eq!(bitmap.highest(), Some(3));
        assert!(bitmap.is_set(3));
        assert!(!bitmap.is_set(17));
    }

    #[test]
    fn queue_is_fifo() {
        let mut queue = TaskQueue::new();
        queue.enqueue(Pid::new(4));
        queue.enqueue(Pid::new(2));
        queue.enqueue(Pid::new(9));

        assert!(queue.remove(Pid::new(2)));
        assert!(!queue.remove(Pid::new(2)));
        assert_eq!(queue.dequeue_head(), Some(Pid::new(4)));
        assert_eq!(queue.dequeue_head(), Some(Pid::new(9)));
        assert_eq!(queue.dequeue_head(), None);
    }

    #[test]
    fn highest_level_wins_and_fifo_within_level() {
        let mut queues = RunQueueSet::new();
        let mut low = task(2, Priority::Level(1));
        let mut first = task(3, Priority::Level(6));
        let mut second = task(4, Priority::Level(6));

        queues.enqueue(&mut low);
        queues.enqueue(&mut first);
        queues.enqueue(&mut second);

        assert_eq!(queues.highest_nonempty(), Some(Pid::new(3)));
        assert_eq!(first.membership(), Membership::Ready(6));

        assert!(queues.dequeue(&mut first));
        assert_eq!(queues.highest_nonempty(), Some(Pid::new(4)));

        assert!(queues.dequeue(&mut second));
        assert!(!queues.bitmap().is_set(6));
        assert_eq!(queues.highest_nonempty(), Some(Pid::new(2)));
        assert!(queues.is_consistent());
    }

    #[test]
    fn background_slot_is_the_fallback() {
        let mut queues = RunQueueSet::new();
        let mut idle = Task::idle("");
        queues.enqueue(&mut idle);

        assert_eq!(idle.membership(), Membership::Background);
        assert_eq!(queues.bitmap().bits(), 0);
        assert_eq!(queues.highest_nonempty(), Some(Pid::IDLE));

        let mut ready = task(5, Priority::Level(0));
        queues.enqueue(&mut ready);
        assert_eq!(queues.highest_nonempty(), Some(Pid::new(5)));
    }

    #[test]
    fn dequeue_of_detached_task_is_a_no_op() {
        let mut queues = RunQueueSet::new();
        let mut stray = task(6, Priority::Level(2));
        assert!(!queues.dequeue(&mut stray));
        assert_eq!(stray.membership(), Membership::Detached);
    }

    #[test]
    fn rebuild_after_batch() {
        let mut queues = RunQueueSet::new();
        let mut a = task(2, Priority::Level(4));
        queues.enqueue(&mut a);

        assert_eq!(queues.take_head(4), Some(Pid::new(2)));
        assert!(!queues.is_consistent());

        queues.rebuild();
        assert!(queues.is_consistent());
        assert_eq!(queues.bitmap().bits(), 0);
    }
}
