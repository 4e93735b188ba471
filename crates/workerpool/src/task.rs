use std::any::Any;

use crate::priority::Priority;
use crate::task_id::TaskId;
use crate::task_name::TaskName;

/// The opaque argument a task carries. Ownership passes to the pool on submission and to the
/// worker running the task on dequeue, matching the C original's `void*` convention: the task
/// function is what actually knows the concrete type and is responsible for dealing with it.
pub type TaskArgument = Box<dyn Any + Send>;

/// The work to perform, given back its argument.
pub type TaskFn = Box<dyn FnOnce(TaskArgument) + Send>;

/// Called when a *queued* (never dispatched) task is cancelled, so the caller can release
/// whatever the argument references. Never called for a task that has already started running.
pub type CancelCallback<'a> = &'a mut dyn FnMut(TaskId, TaskArgument);

/// A single unit of work sitting in the queue.
///
/// This is the "queue node" of the spec: a task record plus enough bookkeeping (`sequence`) to
/// make the priority queue's ordering stable.
pub(crate) struct QueuedTask {
    pub(crate) task_id: TaskId,
    pub(crate) name: TaskName,
    pub(crate) priority: Priority,
    /// Submission order, used only to break ties between equal priorities.
    pub(crate) sequence: u64,
    pub(crate) function: TaskFn,
    pub(crate) argument: TaskArgument,
}

impl QueuedTask {
    /// The `(priority, sequence)` pair the queue is sorted by.
    pub(crate) fn sort_key(&self) -> (Priority, u64) {
        (self.priority, self.sequence)
    }
}
