//! The main loop executed by every worker thread.
//!
//! See the pool-level design note on resize: a worker never computes "is my index still in
//! range" itself. Instead the resize engine marks a retiring worker's slot `ExitingResize`
//! directly, under the pool mutex, the moment it decides that worker is being retired. This
//! module's only job is to notice that marking -- whether it happens while the worker is idle and
//! waiting, or while it's off executing a task -- and terminate instead of looping again.

use std::panic;
use std::sync::Arc;

use crate::pool::{PoolInner, WORKER_WAIT_TIMEOUT};
use crate::worker::WorkerStatus;

/// Run worker `index`'s main loop until shutdown or resize retires it.
///
/// Invariant maintained across every iteration: no pool lock is held while `task.function` runs.
pub(crate) fn run(pool: Arc<PoolInner>, index: usize) {
    log::debug!("worker {index}: started");

    loop {
        // Dequeue and the IDLE -> BUSY transition happen under one held lock: if it were split
        // into two separate acquisitions, a resize's `shrink` could mark this slot
        // `ExitingResize` in the gap, and `mark_busy` would then overwrite that retirement and
        // double-account `idle_threads`. See the pool-level design note on this loop's contract.
        let task = {
            let mut guard = pool.state.lock().unwrap();
            let task = loop {
                if guard.workers[index].status == WorkerStatus::ExitingResize {
                    guard.mark_exiting(index, WorkerStatus::ExitingResize);
                    log::debug!("worker {index}: retired by resize while idle");
                    return;
                }
                if guard.shutdown && guard.queue.is_empty() {
                    guard.mark_exiting(index, WorkerStatus::ExitingShutdown);
                    log::debug!("worker {index}: shutting down, queue drained");
                    return;
                }
                if let Some(task) = guard.queue.dequeue_highest() {
                    break task;
                }
                let (next_guard, _timeout_result) =
                    pool.cond.wait_timeout(guard, WORKER_WAIT_TIMEOUT).unwrap();
                guard = next_guard;
            };
            guard.mark_busy(index, task.task_id, task.name.clone());
            task
        };

        let task_id = task.task_id;
        let name = task.name.clone();

        log::trace!("worker {index}: running task {task_id} ({name})");
        // A panicking task function must not take the slot's bookkeeping down with it -- without
        // this, a single bad task would leave `idle_threads`/`thread_count` permanently wrong for
        // the rest of the pool's life. Catching it here keeps the invariant-preserving discipline
        // intact; the panic is still visible, just as a log line instead of a poisoned pool.
        let outcome =
            panic::catch_unwind(panic::AssertUnwindSafe(move || (task.function)(task.argument)));
        if let Err(payload) = outcome {
            log::error!(
                "worker {index}: task {task_id} ({name}) panicked: {}",
                panic_message(&payload)
            );
        }
        log::trace!("worker {index}: finished task {task_id} ({name})");

        let (idle_threads, thread_count, min_threads, retiring) = {
            let mut guard = pool.state.lock().unwrap();
            if guard.workers[index].status == WorkerStatus::ExitingResize {
                // Resize retired us while we were off running the task; honor that instead of
                // going back to idle, or we'd resurrect a worker the pool thinks is gone.
                guard.mark_exiting(index, WorkerStatus::ExitingResize);
                (0, 0, 0, true)
            } else {
                guard.mark_idle(index);
                (
                    guard.idle_threads,
                    guard.thread_count,
                    guard.min_threads,
                    false,
                )
            }
        };

        pool.cond.notify_all();

        if retiring {
            log::debug!("worker {index}: retired by resize after finishing its task");
            return;
        }

        crate::auto_adjust::notify_on_low_watermark(&pool, idle_threads, thread_count, min_threads);
    }
}

/// Best-effort extraction of a panic payload's message, for logging.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolHandle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;
    use std::time::Duration;

    #[test]
    fn panicking_task_does_not_wedge_the_pool() {
        let pool = PoolHandle::create(1).unwrap();
        let ran = StdArc::new(AtomicUsize::new(0));

        pool.submit(
            Box::new(|_| panic!("boom")),
            Box::new(()),
            Some("panics"),
            crate::priority::Priority::Normal,
        )
        .unwrap();

        let ran_clone = StdArc::clone(&ran);
        pool.submit(
            Box::new(move |_| {
                ran_clone.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(()),
            Some("after-panic"),
            crate::priority::Priority::Normal,
        )
        .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while ran.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(ran.load(Ordering::SeqCst), 1);

        // The worker still has to re-acquire the pool lock and call `mark_idle` after the closure
        // above returns; give it a moment to do so before checking the counters.
        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        loop {
            let stats = pool.get_stats();
            if stats.idle_threads == stats.thread_count {
                break;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "worker never returned to idle after the panicking task"
            );
            std::thread::sleep(Duration::from_millis(5));
        }
        pool.shutdown(None).unwrap();
    }
}
