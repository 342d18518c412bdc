//! # Scheduler Module
//!
//! Cooperative task scheduling over a logical millisecond clock.
//!
//! The simulation has no threads and no async runtime: a priority queue
//! orders tasks by fire time, and the registry pops everything due up to the
//! current deadline, running each task to completion before the next fires.
//! Periodic tasks re-enqueue themselves under the same handle, so a single
//! cancellation stops the whole series.

use crate::BrickId;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

/// Simulated time in milliseconds.
pub type Tick = u64;

/// Cancellation handle for a scheduled task.
pub type TaskId = u64;

/// The work a scheduled entry performs when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Periodic hero intent poll
    HeroStep,
    /// Periodic movement of one monster
    MonsterStep(BrickId),
    /// Deferred chest resolution after opening
    ResolveChest(BrickId),
    /// Deferred trapdoor resolution after opening
    ResolveDoor(BrickId),
    /// Fight cleanup for one monster
    EndFight(BrickId),
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    fire_at: Tick,
    seq: u64,
    id: TaskId,
    task: Task,
    period: Option<Tick>,
}

// Ordering is (fire_at, seq); seq is unique so ties cannot occur and
// insertion order is preserved among same-deadline tasks.
impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.fire_at, self.seq).cmp(&(other.fire_at, other.seq))
    }
}

/// Priority queue of (fire-time, task) entries with lazy cancellation.
///
/// # Examples
///
/// ```
/// use delve::{Task, TaskQueue};
///
/// let mut queue = TaskQueue::new();
/// let id = queue.schedule_after(0, 100, Task::HeroStep);
/// assert!(queue.pop_due(50).is_none());
/// let (fired, task) = queue.pop_due(100).unwrap();
/// assert_eq!(fired, id);
/// assert_eq!(task, Task::HeroStep);
/// ```
#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    cancelled: HashSet<TaskId>,
    next_id: TaskId,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a one-shot task `delay` ms after `now`.
    pub fn schedule_after(&mut self, now: Tick, delay: Tick, task: Task) -> TaskId {
        self.push(now + delay, task, None)
    }

    /// Schedules a periodic task first firing `period` ms after `now`.
    pub fn schedule_every(&mut self, now: Tick, period: Tick, task: Task) -> TaskId {
        // A zero period would fire forever at one deadline.
        let period = period.max(1);
        self.push(now + period, task, Some(period))
    }

    /// Cancels a task. Safe to call for handles that already fired.
    pub fn cancel(&mut self, id: TaskId) {
        self.cancelled.insert(id);
    }

    /// Pops the next task due at or before `now`, in (fire-time, insertion)
    /// order. Periodic tasks re-enqueue themselves under the same handle
    /// before being returned. Cancelled entries are dropped silently.
    pub fn pop_due(&mut self, now: Tick) -> Option<(TaskId, Task)> {
        while let Some(Reverse(entry)) = self.heap.peek().copied() {
            if entry.fire_at > now {
                return None;
            }
            self.heap.pop();
            if self.cancelled.remove(&entry.id) {
                continue;
            }
            if let Some(period) = entry.period {
                let seq = self.bump_seq();
                self.heap.push(Reverse(Scheduled {
                    fire_at: entry.fire_at + period,
                    seq,
                    ..entry
                }));
            }
            return Some((entry.id, entry.task));
        }
        None
    }

    /// Fire time of the next live entry, if any.
    pub fn next_deadline(&self) -> Option<Tick> {
        self.heap
            .iter()
            .filter(|Reverse(entry)| !self.cancelled.contains(&entry.id))
            .map(|Reverse(entry)| entry.fire_at)
            .min()
    }

    /// Number of live entries.
    pub fn pending(&self) -> usize {
        self.heap
            .iter()
            .filter(|Reverse(entry)| !self.cancelled.contains(&entry.id))
            .count()
    }

    fn push(&mut self, fire_at: Tick, task: Task, period: Option<Tick>) -> TaskId {
        self.next_id += 1;
        let id = self.next_id;
        let seq = self.bump_seq();
        self.heap.push(Reverse(Scheduled {
            fire_at,
            seq,
            id,
            task,
            period,
        }));
        id
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}
