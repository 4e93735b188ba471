use std::collections::VecDeque;

use crate::task::QueuedTask;
use crate::task_id::TaskId;
use crate::task_name::TaskName;

/// Where a name lookup found its match in the queue. Only `Queued` is reachable here; a running
/// match is resolved by `PoolState`, not by the queue itself.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Position {
    Queued,
}

/// The priority task queue: `(priority, submission order)`-sorted storage for tasks waiting to
/// run.
///
/// Conceptually this is the spec's singly-linked list with head/tail; we use a `VecDeque` kept
/// sorted by binary-search insertion instead, which gives the same dequeue-highest-with-FIFO-
/// tiebreak behavior with O(log n) positioning and O(1) `pop_front`/`len`, and lets us reuse
/// `VecDeque::remove` for cancellation instead of hand-rolling list unlinking.
#[derive(Default)]
pub(crate) struct PriorityQueue {
    nodes: VecDeque<QueuedTask>,
    next_sequence: u64,
}

impl PriorityQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert `task` at the position that keeps the queue sorted by `(priority, sequence)`.
    ///
    /// The caller is expected to have already set `task.sequence` from [`Self::next_sequence`];
    /// enqueue itself only has to find where it goes.
    pub(crate) fn enqueue(&mut self, task: QueuedTask) {
        let key = task.sort_key();
        let index = self
            .nodes
            .partition_point(|existing| existing.sort_key() <= key);
        self.nodes.insert(index, task);
    }

    /// Reserve the next submission-order sequence number. Must be called while holding the same
    /// lock that serializes `enqueue`, so that sequence order matches the order callers observe
    /// `submit` take effect.
    pub(crate) fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    pub(crate) fn dequeue_highest(&mut self) -> Option<QueuedTask> {
        self.nodes.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First queued task (in dequeue order) whose name matches, if any.
    pub(crate) fn find_by_name(&self, name: &str) -> Option<(TaskId, Position)> {
        self.nodes
            .iter()
            .find(|t| t.name.as_str() == name)
            .map(|t| (t.task_id, Position::Queued))
    }

    /// Remove and return the queued task with the given id, if it is still queued.
    pub(crate) fn remove_by_id(&mut self, task_id: TaskId) -> Option<QueuedTask> {
        let index = self.nodes.iter().position(|t| t.task_id == task_id)?;
        self.nodes.remove(index)
    }

    /// Remove and return the first queued task with the given name, if any.
    pub(crate) fn remove_by_name(&mut self, name: &str) -> Option<QueuedTask> {
        let index = self.nodes.iter().position(|t| t.name.as_str() == name)?;
        self.nodes.remove(index)
    }

    /// Drop every queued task without running its function. Returns the dropped tasks' ids and
    /// arguments in queue order, so a caller (e.g. `Pool::shutdown`'s drain callback) can decide
    /// what to do with them; dropping the returned iterator without consuming it silently frees
    /// everything, matching the spec's "arguments are leaked unless the caller drains first".
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (TaskId, TaskName, super::task::TaskArgument)> + '_ {
        self.nodes
            .drain(..)
            .map(|t| (t.task_id, t.name, t.argument))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::Priority;
    use crate::task_id::TaskIdAllocator;

    /// Build a queued task with a fresh id from a scratch allocator; tests only care about
    /// ordering relative to other tasks built the same way within one test.
    fn task(ids: &TaskIdAllocator, priority: Priority, sequence: u64, name: &str) -> QueuedTask {
        QueuedTask {
            task_id: ids.allocate(),
            name: TaskName::new(name),
            priority,
            sequence,
            function: Box::new(|_| {}),
            argument: Box::new(()),
        }
    }

    #[test]
    fn dequeues_in_priority_order() {
        let ids = TaskIdAllocator::new();
        let mut q = PriorityQueue::new();
        let seq = q.next_sequence();
        q.enqueue(task(&ids, Priority::Background, seq, "bg"));
        let seq = q.next_sequence();
        q.enqueue(task(&ids, Priority::High, seq, "hi"));
        let seq = q.next_sequence();
        q.enqueue(task(&ids, Priority::Normal, seq, "normal"));

        let mut seen = vec![];
        while let Some(t) = q.dequeue_highest() {
            seen.push(t.name.as_str().to_owned());
        }
        assert_eq!(seen, vec!["hi", "normal", "bg"]);
    }

    #[test]
    fn equal_priority_is_fifo() {
        let ids = TaskIdAllocator::new();
        let mut q = PriorityQueue::new();
        for name in ["A", "B", "C", "D", "E"] {
            let seq = q.next_sequence();
            q.enqueue(task(&ids, Priority::Normal, seq, name));
        }
        let mut seen = vec![];
        while let Some(t) = q.dequeue_highest() {
            seen.push(t.name.as_str().to_owned());
        }
        assert_eq!(seen, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn find_and_remove_by_name() {
        let ids = TaskIdAllocator::new();
        let mut q = PriorityQueue::new();
        for name in ["A", "B", "C"] {
            let seq = q.next_sequence();
            q.enqueue(task(&ids, Priority::Normal, seq, name));
        }
        assert!(q.find_by_name("B").is_some());
        let removed = q.remove_by_name("B").unwrap();
        assert_eq!(removed.name.as_str(), "B");
        assert!(q.find_by_name("B").is_none());
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn drain_empties_the_queue_without_running_anything() {
        let ids = TaskIdAllocator::new();
        let mut q = PriorityQueue::new();
        for name in ["A", "B"] {
            let seq = q.next_sequence();
            q.enqueue(task(&ids, Priority::Normal, seq, name));
        }
        let drained: Vec<_> = q.drain().collect();
        assert_eq!(drained.len(), 2);
        assert!(q.is_empty());
    }

    fn priority_from_u8(tag: u8) -> Priority {
        match tag % 4 {
            0 => Priority::High,
            1 => Priority::Normal,
            2 => Priority::Low,
            _ => Priority::Background,
        }
    }

    proptest::proptest! {
        /// Invariant 2: dequeuing the whole queue always yields non-decreasing priority.
        #[test]
        fn dequeue_order_is_never_priority_inverted(tags in proptest::collection::vec(0u8..4, 0..64)) {
            let ids = TaskIdAllocator::new();
            let mut q = PriorityQueue::new();
            for (i, tag) in tags.iter().enumerate() {
                let seq = q.next_sequence();
                q.enqueue(task(&ids, priority_from_u8(*tag), seq, &format!("t{i}")));
            }

            let mut last = Priority::High;
            while let Some(t) = q.dequeue_highest() {
                proptest::prop_assert!(last <= t.priority);
                last = t.priority;
            }
        }

        /// Invariant 3: among tasks of one priority tier, dequeue order matches submission order.
        #[test]
        fn equal_priority_tier_is_always_fifo(count in 0usize..32) {
            let ids = TaskIdAllocator::new();
            let mut q = PriorityQueue::new();
            for i in 0..count {
                let seq = q.next_sequence();
                q.enqueue(task(&ids, Priority::Normal, seq, &format!("t{i}")));
            }

            let mut last_sequence = None;
            while let Some(t) = q.dequeue_highest() {
                if let Some(prev) = last_sequence {
                    proptest::prop_assert!(prev < t.sequence);
                }
                last_sequence = Some(t.sequence);
            }
        }
    }
}
