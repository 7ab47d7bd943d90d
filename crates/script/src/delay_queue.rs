use moor_common::ObjectId;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

/// A verb invocation deferred until `deadline` (spec.md §4.9 `fork`/`delay`).
#[derive(Clone, Debug)]
pub struct DelayedTask {
    pub id: u64,
    pub object_id: ObjectId,
    pub verb: String,
    pub args: Vec<String>,
}

#[derive(Clone, Debug)]
struct ScheduledEntry {
    deadline: Instant,
    seq: u64,
    task: DelayedTask,
}

impl PartialEq for ScheduledEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}
impl Eq for ScheduledEntry {}

impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the earliest deadline
        // first; ties broken by insertion order.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of pending deferred verb invocations, keyed on a monotonic
/// deadline (spec.md §4.9). Cancellation is O(n) — `fork`/`delay` usage is
/// expected to stay small enough per world that this doesn't matter.
pub struct DelayQueue {
    heap: Mutex<BinaryHeap<ScheduledEntry>>,
    next_id: AtomicU64,
    next_seq: AtomicU64,
}

impl Default for DelayQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DelayQueue {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            next_id: AtomicU64::new(1),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn schedule(&self, object_id: ObjectId, verb: String, args: Vec<String>, delay: Duration) -> u64 {
        let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let deadline = Instant::now() + delay;
        self.heap.lock().push(ScheduledEntry {
            deadline,
            seq,
            task: DelayedTask { id, object_id, verb, args },
        });
        id
    }

    /// Removes a pending task before it fires. Returns `false` if it already
    /// fired or never existed.
    pub fn cancel(&self, id: u64) -> bool {
        let mut heap = self.heap.lock();
        let before = heap.len();
        let remaining: Vec<ScheduledEntry> = heap.drain().filter(|e| e.task.id != id).collect();
        let removed = remaining.len() != before;
        *heap = remaining.into_iter().collect();
        removed
    }

    /// Drains and returns every task whose deadline has passed, earliest
    /// first. The dispatcher's main loop calls this between commands.
    pub fn pop_ready(&self) -> Vec<DelayedTask> {
        let mut heap = self.heap.lock();
        let now = Instant::now();
        let mut ready = Vec::new();
        while let Some(top) = heap.peek() {
            if top.deadline > now {
                break;
            }
            ready.push(heap.pop().unwrap().task);
        }
        ready
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.lock().peek().map(|e| e.deadline)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_ready_returns_nothing_before_deadline() {
        let q = DelayQueue::new();
        q.schedule(ObjectId::from_str("obj"), "spin".into(), vec![], Duration::from_secs(60));
        assert!(q.pop_ready().is_empty());
    }

    #[test]
    fn pop_ready_returns_expired_tasks_in_deadline_order() {
        let q = DelayQueue::new();
        let later = q.schedule(ObjectId::from_str("a"), "v".into(), vec![], Duration::from_millis(20));
        let sooner = q.schedule(ObjectId::from_str("b"), "v".into(), vec![], Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(30));
        let ready = q.pop_ready();
        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0].id, sooner);
        assert_eq!(ready[1].id, later);
    }

    #[test]
    fn cancel_removes_a_pending_task() {
        let q = DelayQueue::new();
        let id = q.schedule(ObjectId::from_str("a"), "v".into(), vec![], Duration::from_secs(60));
        assert!(q.cancel(id));
        assert!(q.is_empty());
        assert!(!q.cancel(id));
    }
}
