use crate::task_id::TaskId;
use crate::task_name::TaskName;

/// A worker's lifecycle state, as visible to introspection and to the resize engine.
///
/// `Dead` is reachable only after a worker's thread has actually returned from its main loop; it
/// exists so a slot can be inspected one last time (e.g. by a concurrent `get_stats` call that
/// raced the join) without panicking on a half-torn-down slot.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum WorkerStatus {
    Idle,
    Busy,
    ExitingShutdown,
    ExitingResize,
    Dead,
}

impl WorkerStatus {
    pub fn is_idle(self) -> bool {
        matches!(self, WorkerStatus::Idle)
    }
}

/// Everything about one worker that's visible under the pool mutex.
///
/// Indexed by a stable 0-based `index` for the worker's lifetime (see [`crate::state::PoolState`]);
/// only the worker's own thread, or `resize` marking an out-of-range worker for exit, ever writes
/// into a slot, and both always do so while holding the pool mutex.
pub(crate) struct WorkerSlot {
    pub(crate) status: WorkerStatus,
    pub(crate) running_task_name: TaskName,
    /// Id of the task currently occupying this slot, if any. Kept alongside the name so
    /// `find_by_name`/`cancel_by_name` can report the id of a *running* match without needing a
    /// separate id-keyed index.
    pub(crate) running_task_id: Option<TaskId>,
    /// Join handle for the worker thread, taken by `destroy`/shrink once the slot is confirmed
    /// exiting. `None` once joined.
    pub(crate) handle: Option<std::thread::JoinHandle<()>>,
}

impl WorkerSlot {
    pub(crate) fn new_idle(handle: std::thread::JoinHandle<()>) -> Self {
        WorkerSlot {
            status: WorkerStatus::Idle,
            running_task_name: TaskName::idle(),
            running_task_id: None,
            handle: Some(handle),
        }
    }

    /// A slot for a worker that failed to spawn mid-grow: logically present for a moment (so
    /// `thread_count` can be corrected down to the actually-alive count) but already exiting, per
    /// the resize rollback rule in the spec's error-handling section.
    pub(crate) fn new_stillborn() -> Self {
        WorkerSlot {
            status: WorkerStatus::ExitingResize,
            running_task_name: TaskName::idle(),
            running_task_id: None,
            handle: None,
        }
    }
}
