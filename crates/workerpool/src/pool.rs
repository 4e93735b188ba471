use std::sync::Arc;
use std::time::Duration;

use pool_sync::sync::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::priority::Priority;
use crate::state::PoolState;
use crate::stats::Stats;
use crate::task::{CancelCallback, QueuedTask, TaskArgument, TaskFn};
use crate::task_id::{TaskId, TaskIdAllocator};
use crate::task_name::TaskName;
use crate::worker::WorkerSlot;
use crate::worker_loop;

/// Workers wake up at least this often even with nothing to do, so a missed signal (shutdown,
/// resize, or a new task) is never fatal to liveness -- see the spec's bounded-wait design note.
pub(crate) const WORKER_WAIT_TIMEOUT: Duration = Duration::from_millis(500);

pub(crate) struct ControllerState {
    pub(crate) enabled: bool,
    pub(crate) high_watermark: usize,
    pub(crate) low_watermark: usize,
    pub(crate) interval: Duration,
    pub(crate) handle: Option<std::thread::JoinHandle<()>>,
}

impl ControllerState {
    fn disabled() -> Self {
        ControllerState {
            enabled: false,
            high_watermark: 0,
            low_watermark: 0,
            interval: Duration::from_secs(1),
            handle: None,
        }
    }
}

/// All pool state that lives behind `Arc` so that [`PoolHandle`] clones share one pool.
pub(crate) struct PoolInner {
    pub(crate) state: Mutex<PoolState>,
    pub(crate) cond: Condvar,
    /// Serializes concurrent `resize`/`set_limits` calls. Always acquired *before* `state`, never
    /// after -- see the §5 lock-ordering argument.
    pub(crate) resize_lock: Mutex<()>,
    pub(crate) task_ids: TaskIdAllocator,
    pub(crate) controller: Mutex<ControllerState>,
    pub(crate) controller_cond: Condvar,
}

/// A handle to a running worker pool.
///
/// Cloning a `PoolHandle` is cheap (it's an `Arc` bump) and is how multiple producer threads share
/// one pool. [`PoolHandle::shutdown`] is safe to call from any clone and is idempotent: the first
/// call drains and joins everything, later calls (from this or any other clone) just observe that
/// shutdown already happened and return immediately.
#[derive(Clone)]
pub struct PoolHandle {
    pub(crate) inner: Arc<PoolInner>,
}

/// What happened to queued tasks that were never dispatched, returned by [`PoolHandle::shutdown`].
#[derive(Default, Debug, Eq, PartialEq)]
pub struct DrainReport {
    /// Number of still-queued tasks whose arguments were handed to the drain callback (or
    /// dropped, if no callback was given).
    pub tasks_drained: usize,
}

/// Where [`PoolHandle::find_by_name`] found a matching task.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TaskLocation {
    /// Still waiting in the queue.
    Queued,
    /// Currently dispatched to a worker.
    Running,
}

impl PoolHandle {
    /// Create a pool with `initial_count` workers, `min_threads = 1`, and
    /// `max_threads = 2 * initial_count`, matching the spec's default bounds.
    pub fn create(initial_count: usize) -> Result<Self> {
        if initial_count == 0 {
            return Err(Error::ArgumentInvalid {
                reason: "initial_count must be at least 1",
            });
        }

        let max_threads = initial_count
            .checked_mul(2)
            .ok_or(Error::ArgumentInvalid {
                reason: "initial_count is too large to double for the default max_threads",
            })?;

        let inner = Arc::new(PoolInner {
            state: Mutex::new(PoolState::new(1, max_threads)),
            cond: Condvar::new(),
            resize_lock: Mutex::new(()),
            task_ids: TaskIdAllocator::new(),
            controller: Mutex::new(ControllerState::disabled()),
            controller_cond: Condvar::new(),
        });

        {
            let mut guard = inner.state.lock().unwrap();
            for index in 0..initial_count {
                match spawn_worker(&inner, index) {
                    Ok(slot) => {
                        guard.workers.push(slot);
                        guard.thread_count += 1;
                        guard.idle_threads += 1;
                        guard.started += 1;
                    }
                    Err(err) => {
                        log::error!("worker pool: failed to spawn initial worker {index}: {err}");
                        guard.shutdown = true;
                        drop(guard);
                        join_all_workers(&inner);
                        return Err(Error::SpawnFailed {
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        log::info!("worker pool: created with {initial_count} workers");
        Ok(PoolHandle { inner })
    }

    /// Submit a task at [`Priority::Normal`], as `submit` with no explicit priority.
    pub fn submit_default(
        &self,
        function: TaskFn,
        argument: TaskArgument,
        name: Option<&str>,
    ) -> Result<TaskId> {
        self.submit(function, argument, name, Priority::Normal)
    }

    /// Submit a task. Returns the assigned id, or `StateInvalid` if the pool is shutting down.
    pub fn submit(
        &self,
        function: TaskFn,
        argument: TaskArgument,
        name: Option<&str>,
        priority: Priority,
    ) -> Result<TaskId> {
        let task_id = self.inner.task_ids.allocate();
        let name = match name {
            Some(n) if !n.is_empty() => TaskName::new(n),
            _ => TaskName::synthesize(task_id),
        };

        let mut guard = self.inner.state.lock().unwrap();
        if guard.shutdown {
            return Err(Error::StateInvalid);
        }

        let sequence = guard.queue.next_sequence();
        guard.queue.enqueue(QueuedTask {
            task_id,
            name,
            priority,
            sequence,
            function,
            argument,
        });
        let queue_size = guard.queue.len();
        let thread_count = guard.thread_count;
        let max_threads = guard.max_threads;
        drop(guard);

        self.inner.cond.notify_one();
        crate::auto_adjust::notify_on_high_watermark(&self.inner, queue_size, thread_count, max_threads);

        Ok(task_id)
    }

    pub fn get_stats(&self) -> Stats {
        self.inner.state.lock().unwrap().stats()
    }

    /// Resize the pool to exactly `target` workers. See §4.4: serialized against concurrent
    /// resizes, rejects a `target` outside the current `[min, max]` bounds, and shrinking returns
    /// before the retiring workers have actually exited.
    pub fn resize(&self, target: usize) -> Result<()> {
        crate::auto_adjust::resize(&self.inner, target)
    }

    /// Change the pool's `[min, max]` bounds, resizing to the nearest boundary if `thread_count`
    /// now falls outside them.
    pub fn set_limits(&self, min: usize, max: usize) -> Result<()> {
        crate::auto_adjust::set_limits(&self.inner, min, max)
    }

    /// Enable (or reconfigure) the auto-adjust controller. See §4.5.
    pub fn enable_auto_adjust(
        &self,
        high_watermark: usize,
        low_watermark: usize,
        interval: Duration,
    ) -> Result<()> {
        crate::auto_adjust::enable(&self.inner, high_watermark, low_watermark, interval)
    }

    /// Disable the auto-adjust controller, joining its thread if one was running. A no-op if it
    /// was already disabled.
    pub fn disable_auto_adjust(&self) {
        crate::auto_adjust::disable(&self.inner)
    }

    /// Snapshot of every worker's currently-running task name (or `"[idle]"`), indexed by worker
    /// index, taken under the pool mutex.
    pub fn get_running_task_names(&self) -> Vec<TaskName> {
        self.inner.state.lock().unwrap().running_task_names()
    }

    /// Find a task by name, whether queued or currently running.
    ///
    /// Returns `None` if no task with that name exists right now.
    pub fn find_by_name(&self, name: &str) -> Option<(TaskId, TaskLocation)> {
        let guard = self.inner.state.lock().unwrap();
        if let Some((id, _)) = guard.queue.find_by_name(name) {
            return Some((id, TaskLocation::Queued));
        }
        guard
            .find_running_by_name(name)
            .map(|id| (id, TaskLocation::Running))
    }

    /// Cancel a queued task by id. Returns `Ok(())` once `cb` (if any) has been invoked with the
    /// task's argument, `Err(RunningNotCancellable)` if it has already been dispatched, or
    /// `Err(NotFound)` if no such task exists.
    pub fn cancel_by_id(&self, task_id: TaskId, cb: Option<CancelCallback<'_>>) -> Result<()> {
        let mut guard = self.inner.state.lock().unwrap();
        if let Some(task) = guard.queue.remove_by_id(task_id) {
            drop(guard);
            if let Some(cb) = cb {
                cb(task.task_id, task.argument);
            }
            return Ok(());
        }

        if guard.is_running(task_id) {
            let name = guard
                .workers
                .iter()
                .find(|w| w.running_task_id == Some(task_id))
                .map(|w| w.running_task_name.clone())
                .expect("is_running just confirmed a matching slot");
            drop(guard);
            return Err(Error::RunningNotCancellable { name });
        }

        drop(guard);
        Err(Error::NotFound)
    }

    /// Cancel a queued task by name. See [`Self::cancel_by_id`].
    pub fn cancel_by_name(&self, name: &str, cb: Option<CancelCallback<'_>>) -> Result<()> {
        let mut guard = self.inner.state.lock().unwrap();
        if let Some(task) = guard.queue.remove_by_name(name) {
            drop(guard);
            if let Some(cb) = cb {
                cb(task.task_id, task.argument);
            }
            return Ok(());
        }

        let is_running = guard.find_running_by_name(name).is_some();
        drop(guard);

        if is_running {
            Err(Error::RunningNotCancellable {
                name: TaskName::new(name),
            })
        } else {
            Err(Error::NotFound)
        }
    }

    /// Shut the pool down: stop accepting new tasks, wake and join every worker, and drain
    /// whatever is still queued through `drain_callback` (or silently, if `None`).
    ///
    /// Idempotent: calling this on a pool that has already shut down (from this handle or any
    /// clone) is a no-op that returns `Ok(DrainReport::default())`.
    pub fn shutdown(&self, mut drain_callback: Option<CancelCallback<'_>>) -> Result<DrainReport> {
        crate::auto_adjust::disable(&self.inner);

        {
            let mut guard = self.inner.state.lock().unwrap();
            if guard.shutdown {
                return Ok(DrainReport::default());
            }
            guard.shutdown = true;
        }

        self.inner.cond.notify_all();
        // A second broadcast after a short delay guards against a worker that re-checked its
        // predicates just before `shutdown` flipped and is about to re-enter its wait.
        std::thread::sleep(Duration::from_millis(5));
        self.inner.cond.notify_all();

        join_all_workers(&self.inner);

        let mut guard = self.inner.state.lock().unwrap();
        let mut tasks_drained = 0usize;
        for (task_id, _name, argument) in guard.queue.drain() {
            if let Some(cb) = drain_callback.as_deref_mut() {
                cb(task_id, argument);
            }
            tasks_drained += 1;
        }

        log::info!("worker pool: shut down, {tasks_drained} queued tasks drained");
        Ok(DrainReport { tasks_drained })
    }
}

/// Spawn one worker thread at `index`. Does not touch `PoolState`'s counters; the caller updates
/// `thread_count`/`idle_threads`/`started` once it knows the spawn succeeded.
pub(crate) fn spawn_worker(
    inner: &Arc<PoolInner>,
    index: usize,
) -> std::io::Result<WorkerSlot> {
    let pool = Arc::clone(inner);
    let handle = std::thread::Builder::new()
        .name(format!("workerpool-{index}"))
        .spawn(move || worker_loop::run(pool, index))?;
    Ok(WorkerSlot::new_idle(handle))
}

/// Join every worker slot that has a handle. Workers notice `shutdown`/resize and exit on their
/// own (bounded by the worker loop's own wait timeout); this just waits for the OS threads to
/// actually finish. Rust has no safe equivalent of `pthread_cancel`, so there is no bounded-
/// deadline-then-cancel fallback here -- the worker loop's wait timeout is the liveness backstop
/// instead. A panicking task is caught and logged rather than propagated, per the spec's
/// "unrecoverable internal errors" policy.
pub(crate) fn join_all_workers(inner: &Arc<PoolInner>) {
    let handles: Vec<_> = {
        let mut guard = inner.state.lock().unwrap();
        guard
            .workers
            .iter_mut()
            .enumerate()
            .filter_map(|(index, w)| w.handle.take().map(|h| (index, h)))
            .collect()
    };

    for (index, handle) in handles {
        let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
        if let Err(err) = handle.join() {
            log::error!("worker pool: worker thread {name} panicked during shutdown: {err:?}");
        }
        // The thread has actually returned now; its slot is reachable one last time by anyone
        // racing a `get_stats`/`get_running_task_names` call against this join, per the spec's
        // `Dead` state.
        inner.state.lock().unwrap().workers[index].status = crate::worker::WorkerStatus::Dead;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_spawns_requested_workers_idle() {
        let pool = PoolHandle::create(3).unwrap();
        let stats = pool.get_stats();
        assert_eq!(stats.thread_count, 3);
        assert_eq!(stats.idle_threads, 3);
        assert_eq!(stats.min_threads, 1);
        assert_eq!(stats.max_threads, 6);
        pool.shutdown(None).unwrap();
    }

    #[test]
    fn submit_assigns_increasing_ids() {
        let pool = PoolHandle::create(1).unwrap();
        let a = pool
            .submit(Box::new(|_| {}), Box::new(()), None, Priority::Normal)
            .unwrap();
        let b = pool
            .submit(Box::new(|_| {}), Box::new(()), None, Priority::Normal)
            .unwrap();
        assert!(b.get() > a.get());
        pool.shutdown(None).unwrap();
    }

    #[test]
    fn shutdown_is_idempotent() {
        let pool = PoolHandle::create(2).unwrap();
        assert!(pool.shutdown(None).is_ok());
        assert_eq!(pool.shutdown(None).unwrap(), DrainReport::default());
    }

    #[test]
    fn cancel_unknown_task_is_not_found() {
        let pool = PoolHandle::create(1).unwrap();
        let bogus = pool
            .submit(Box::new(|_| {}), Box::new(()), Some("real"), Priority::Normal)
            .unwrap();
        pool.shutdown(None).unwrap();
        // The pool is gone now, so even a previously-valid id is unreachable.
        assert!(matches!(
            pool.cancel_by_id(bogus, None),
            Err(Error::NotFound)
        ));
    }

    /// Models the pool's two-lock hierarchy (`resize_lock` strictly outside `state`) in isolation,
    /// without spawning real worker threads, so `loom` can exhaustively check every interleaving
    /// instead of hoping a multi-threaded run happens to hit a bad schedule. See the spec's
    /// "two-lock hierarchy" design note.
    #[test]
    fn resize_lock_ordering_has_no_deadlock_cycle() {
        use pool_sync::sync::{spawn, Mutex as SyncMutex, wrap_test};

        wrap_test(|| {
            let resize_lock = Arc::new(SyncMutex::new(()));
            let state = Arc::new(SyncMutex::new(0u32));

            let threads: Vec<_> = (0..2)
                .map(|_| {
                    let resize_lock = Arc::clone(&resize_lock);
                    let state = Arc::clone(&state);
                    spawn(move || {
                        // Every acquirer takes `resize_lock` first, `state` second -- the pool's
                        // total lock order. Two threads following the same order can never
                        // deadlock each other.
                        let _resize_guard = resize_lock.lock().unwrap();
                        let mut guard = state.lock().unwrap();
                        *guard += 1;
                    })
                })
                .collect();

            for t in threads {
                t.join().unwrap();
            }

            assert_eq!(*state.lock().unwrap(), 2);
        });
    }
}
