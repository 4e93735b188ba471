use crate::queue::PriorityQueue;
use crate::stats::Stats;
use crate::task_id::TaskId;
use crate::task_name::TaskName;
use crate::worker::{WorkerSlot, WorkerStatus};

/// Everything protected by the pool mutex: the queue, the worker slots, and every counter the
/// spec requires to stay consistent with them.
///
/// The one discipline this type exists to enforce: `idle_threads` is never recomputed from the
/// worker slots. Every place that changes a worker's IDLE/BUSY status goes through
/// [`Self::mark_busy`], [`Self::mark_idle`], or [`Self::mark_exiting`], each of which keeps
/// `idle_threads` correct in the same mutation. See the "counter drift" design note.
pub(crate) struct PoolState {
    pub(crate) queue: PriorityQueue,
    pub(crate) workers: Vec<WorkerSlot>,
    pub(crate) thread_count: usize,
    pub(crate) min_threads: usize,
    pub(crate) max_threads: usize,
    pub(crate) idle_threads: usize,
    pub(crate) started: usize,
    pub(crate) shutdown: bool,
}

impl PoolState {
    pub(crate) fn new(min_threads: usize, max_threads: usize) -> Self {
        PoolState {
            queue: PriorityQueue::new(),
            workers: Vec::new(),
            thread_count: 0,
            min_threads,
            max_threads,
            idle_threads: 0,
            started: 0,
            shutdown: false,
        }
    }

    pub(crate) fn mark_busy(&mut self, index: usize, task_id: TaskId, name: TaskName) {
        let slot = &mut self.workers[index];
        debug_assert!(slot.status.is_idle());
        slot.status = WorkerStatus::Busy;
        slot.running_task_name = name;
        slot.running_task_id = Some(task_id);
        self.idle_threads -= 1;
    }

    pub(crate) fn mark_idle(&mut self, index: usize) {
        let slot = &mut self.workers[index];
        slot.status = WorkerStatus::Idle;
        slot.running_task_name = TaskName::idle();
        slot.running_task_id = None;
        self.idle_threads += 1;
    }

    /// Mark a worker as exiting (shutdown or resize). Idempotent and keeps `idle_threads`
    /// consistent regardless of which status the worker was in when it decided to exit.
    pub(crate) fn mark_exiting(&mut self, index: usize, status: WorkerStatus) {
        let slot = &mut self.workers[index];
        if slot.status.is_idle() {
            self.idle_threads -= 1;
        }
        slot.status = status;
    }

    pub(crate) fn stats(&self) -> Stats {
        Stats {
            thread_count: self.thread_count,
            min_threads: self.min_threads,
            max_threads: self.max_threads,
            idle_threads: self.idle_threads,
            queue_size: self.queue.len(),
            started: self.started,
        }
    }

    /// Workers that currently count toward `thread_count`: neither retired by a shrink nor
    /// stillborn from a failed grow. Because worker indices are never reused (see the resize
    /// design note), this is *not* the same as `workers[..thread_count]` once a shrink has
    /// happened -- it's a status filter, not a positional slice.
    fn active_workers(&self) -> impl Iterator<Item = &WorkerSlot> {
        self.workers.iter().filter(|w| {
            matches!(w.status, WorkerStatus::Idle | WorkerStatus::Busy)
        })
    }

    pub(crate) fn running_task_names(&self) -> Vec<TaskName> {
        self.active_workers()
            .map(|w| w.running_task_name.clone())
            .collect()
    }

    /// Find a currently-running task by name, returning its id.
    ///
    /// Deliberately scans *every* slot, not just [`Self::active_workers`]: a worker that resize
    /// marked `ExitingResize` while it was mid-task is still physically running that task until
    /// it returns, and a caller asking "is this task running" needs the honest answer, not the
    /// "does this worker still count toward thread_count" answer.
    pub(crate) fn find_running_by_name(&self, name: &str) -> Option<TaskId> {
        self.workers
            .iter()
            .find(|w| w.running_task_id.is_some() && w.running_task_name.as_str() == name)
            .and_then(|w| w.running_task_id)
    }

    /// Is this task id currently dispatched to some worker? See the note on
    /// [`Self::find_running_by_name`] about why this doesn't go through `active_workers`.
    pub(crate) fn is_running(&self, task_id: TaskId) -> bool {
        self.workers
            .iter()
            .any(|w| w.running_task_id == Some(task_id))
    }
}

#[cfg(debug_assertions)]
impl PoolState {
    /// Check the invariants from §3. Only called from tests and debug-only assertions; it is
    /// deliberately never used as a "recompute and fix up" path (see the counter-drift design
    /// note) — only as a checker.
    pub(crate) fn check_invariants(&self) {
        assert!(self.idle_threads <= self.thread_count);
        assert!(self.min_threads >= 1);
        assert!(self.max_threads >= self.min_threads);
        let actually_idle = self.active_workers().filter(|w| w.status.is_idle()).count();
        assert_eq!(actually_idle, self.idle_threads);
        assert_eq!(self.active_workers().count(), self.thread_count);
    }
}
