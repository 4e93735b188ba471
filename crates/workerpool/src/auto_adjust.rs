//! The resize engine and the optional auto-adjust controller.
//!
//! Both live here because they share one invariant-preserving primitive, [`resize`], and because
//! keeping them in one module makes the lock-acquisition order easy to audit: `resize_lock` is
//! always taken before `state`, `controller` and `state` are never held at the same time, and
//! neither is ever acquired from inside a worker's own critical section.
//!
//! **Worker-index redesign.** The source spec has each worker notice on its own that "my index is
//! now >= thread_count" and self-evict. Implemented literally, that requires a shrunk-then-regrown
//! pool to *reuse* low worker indices -- but the old occupant of that index is only asynchronously
//! retiring (shrink does not wait for it), so a reused index could be written by two threads at
//! once. This implementation sidesteps the hazard by never reusing an index: [`grow`] always
//! allocates the next index as `workers.len()`, and [`shrink`] eagerly marks the retiring range
//! `ExitingResize` itself, under `state`, rather than leaving it for the worker to discover by
//! polling its own index. A worker only ever has to check its *own* slot's status (see
//! `worker_loop`), never recompute a range.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::pool::{spawn_worker, ControllerState, PoolInner};
use crate::worker::{WorkerSlot, WorkerStatus};

/// Validate and record new `[min, max]` bounds; if the current `thread_count` now falls outside
/// them, resize to the nearest boundary once the state lock has been released.
pub(crate) fn set_limits(inner: &Arc<PoolInner>, new_min: usize, new_max: usize) -> Result<()> {
    if new_min == 0 {
        return Err(Error::ArgumentInvalid {
            reason: "min_threads must be at least 1",
        });
    }
    if new_max < new_min {
        return Err(Error::ArgumentInvalid {
            reason: "max_threads must be >= min_threads",
        });
    }

    let boundary = {
        let mut guard = inner.state.lock().unwrap();
        guard.min_threads = new_min;
        guard.max_threads = new_max;
        if guard.thread_count < new_min {
            Some(new_min)
        } else if guard.thread_count > new_max {
            Some(new_max)
        } else {
            None
        }
    };

    if let Some(target) = boundary {
        resize(inner, target)?;
    }
    Ok(())
}

/// Resize the pool to exactly `target` workers.
///
/// Serialized by `resize_lock`, acquired before `state` and held for the entire call, so
/// concurrent `resize`/`set_limits` calls are totally ordered and never interleave their
/// spawn/retire decisions.
pub(crate) fn resize(inner: &Arc<PoolInner>, target: usize) -> Result<()> {
    let _resize_guard = inner.resize_lock.lock().unwrap();

    let (current, min, max, shutdown) = {
        let guard = inner.state.lock().unwrap();
        (
            guard.thread_count,
            guard.min_threads,
            guard.max_threads,
            guard.shutdown,
        )
    };

    if shutdown {
        return Err(Error::StateInvalid);
    }
    if target < min || target > max {
        return Err(Error::OutOfRange {
            target,
            min,
            max,
        });
    }
    if target == current {
        return Ok(());
    }

    if target > current {
        grow(inner, current, target)
    } else {
        shrink(inner, current, target);
        Ok(())
    }
}

/// Spawn `target - current` new workers. If a spawn fails partway through, the workers spawned so
/// far are kept (they're real, running threads); the failed attempt gets a stillborn placeholder
/// slot so its index isn't reused, `thread_count` reflects only the workers that actually started,
/// and the caller sees an error.
///
/// The lock is held across both the spawn and the push for each worker, exactly as `create` does:
/// the new thread's first act is to index `workers[index]` (see `worker_loop::run`), so the slot
/// must already be in place before that thread can possibly win the lock. Reading `workers.len()`
/// and releasing the lock before spawning would let the new thread observe an out-of-bounds index.
fn grow(inner: &Arc<PoolInner>, current: usize, target: usize) -> Result<()> {
    let to_spawn = target - current;
    for _ in 0..to_spawn {
        let mut guard = inner.state.lock().unwrap();
        let index = guard.workers.len();
        match spawn_worker(inner, index) {
            Ok(slot) => {
                guard.workers.push(slot);
                guard.thread_count += 1;
                guard.idle_threads += 1;
                guard.started += 1;
            }
            Err(err) => {
                log::error!("worker pool: resize-grow failed to spawn worker {index}: {err}");
                guard.workers.push(WorkerSlot::new_stillborn());
                let spawned = guard.thread_count - current;
                drop(guard);
                inner.cond.notify_all();
                log::warn!(
                    "worker pool: resize to {target} only spawned {spawned} of {to_spawn} new workers"
                );
                return Err(Error::SpawnFailed {
                    message: err.to_string(),
                });
            }
        }
    }
    log::info!("worker pool: resized up from {current} to {target} workers");
    Ok(())
}

/// Logically shrink to `target` workers immediately and mark the retiring range `ExitingResize`.
/// Returns before those workers' threads have actually exited -- see the "asynchronous
/// contraction" design note -- their OS threads are joined later, by `shutdown`.
fn shrink(inner: &Arc<PoolInner>, current: usize, target: usize) {
    {
        let mut guard = inner.state.lock().unwrap();
        guard.thread_count = target;
        for index in target..current {
            guard.mark_exiting(index, WorkerStatus::ExitingResize);
        }
    }
    inner.cond.notify_all();
    log::info!("worker pool: resized down from {current} to {target} workers (asynchronous)");
}

/// Enable (or reconfigure) the auto-adjust controller.
pub(crate) fn enable(
    inner: &Arc<PoolInner>,
    high_watermark: usize,
    low_watermark: usize,
    interval: Duration,
) -> Result<()> {
    if high_watermark == 0 {
        return Err(Error::ArgumentInvalid {
            reason: "high_watermark must be greater than 0",
        });
    }
    if interval.is_zero() {
        return Err(Error::ArgumentInvalid {
            reason: "interval must be greater than 0",
        });
    }
    if inner.state.lock().unwrap().shutdown {
        return Err(Error::StateInvalid);
    }

    let mut cguard = inner.controller.lock().unwrap();
    cguard.high_watermark = high_watermark;
    cguard.low_watermark = low_watermark;
    cguard.interval = interval;

    if cguard.enabled {
        drop(cguard);
        inner.controller_cond.notify_all();
        log::info!(
            "worker pool: auto-adjust reconfigured (high_wm={high_watermark}, low_wm={low_watermark}, interval={interval:?})"
        );
        return Ok(());
    }

    cguard.enabled = true;
    drop(cguard);

    let pool = Arc::clone(inner);
    let spawned = std::thread::Builder::new()
        .name("workerpool-auto-adjust".to_string())
        .spawn(move || controller_loop(pool));

    let handle = match spawned {
        Ok(handle) => handle,
        Err(err) => {
            // Roll back the `enabled` flag so a retry doesn't take the "already enabled, just
            // reconfigure" path above and silently believe a controller thread exists.
            inner.controller.lock().unwrap().enabled = false;
            return Err(Error::SpawnFailed {
                message: err.to_string(),
            });
        }
    };
    inner.controller.lock().unwrap().handle = Some(handle);

    log::info!(
        "worker pool: auto-adjust enabled (high_wm={high_watermark}, low_wm={low_watermark}, interval={interval:?})"
    );
    Ok(())
}

/// Disable the auto-adjust controller, joining its thread if one is running.
pub(crate) fn disable(inner: &Arc<PoolInner>) {
    let handle = {
        let mut cguard = inner.controller.lock().unwrap();
        if !cguard.enabled {
            return;
        }
        cguard.enabled = false;
        cguard.handle.take()
    };

    inner.controller_cond.notify_all();

    if let Some(handle) = handle {
        if handle.join().is_err() {
            log::error!("worker pool: auto-adjust controller thread panicked while disabling");
        }
    }
    log::info!("worker pool: auto-adjust disabled");
}

/// Wake the controller early if a submission just pushed the queue over `high_watermark` and
/// there's still room to grow, so load spikes don't have to wait out a full `interval`.
pub(crate) fn notify_on_high_watermark(
    inner: &Arc<PoolInner>,
    queue_size: usize,
    thread_count: usize,
    max_threads: usize,
) {
    let cguard = inner.controller.lock().unwrap();
    if cguard.enabled && queue_size > cguard.high_watermark && thread_count < max_threads {
        drop(cguard);
        inner.controller_cond.notify_all();
    }
}

/// Wake the controller early if a worker just went idle and idle count crossed `low_watermark`
/// with room to shrink. See [`notify_on_high_watermark`].
pub(crate) fn notify_on_low_watermark(
    inner: &Arc<PoolInner>,
    idle_threads: usize,
    thread_count: usize,
    min_threads: usize,
) {
    let cguard = inner.controller.lock().unwrap();
    if cguard.enabled && idle_threads > cguard.low_watermark && thread_count > min_threads {
        drop(cguard);
        inner.controller_cond.notify_all();
    }
}

/// The controller thread's body: wake every `interval` (or early, via `controller_cond`), decide
/// whether load calls for growing or shrinking, and resize outside the controller lock so it
/// never contends with `resize`'s own locking.
fn controller_loop(inner: Arc<PoolInner>) {
    log::debug!("auto-adjust: controller started");

    loop {
        let interval = {
            let cguard = inner.controller.lock().unwrap();
            if !cguard.enabled {
                break;
            }
            cguard.interval
        };

        {
            let cguard = inner.controller.lock().unwrap();
            let _ = inner.controller_cond.wait_timeout(cguard, interval).unwrap();
        }

        let (enabled, high_watermark, low_watermark) = {
            let cguard = inner.controller.lock().unwrap();
            (cguard.enabled, cguard.high_watermark, cguard.low_watermark)
        };
        if !enabled {
            break;
        }

        let target = {
            let guard = inner.state.lock().unwrap();
            if guard.shutdown {
                None
            } else if guard.queue.len() > high_watermark && guard.thread_count < guard.max_threads
            {
                Some(guard.thread_count + 1)
            } else if guard.idle_threads > low_watermark && guard.thread_count > guard.min_threads
            {
                Some(guard.thread_count - 1)
            } else {
                None
            }
        };

        if inner.state.lock().unwrap().shutdown {
            break;
        }

        if let Some(target) = target {
            log::debug!("auto-adjust: resizing to {target}");
            if let Err(err) = resize(&inner, target) {
                log::warn!("auto-adjust: resize to {target} failed: {err}");
            }
        }
    }

    log::debug!("auto-adjust: controller exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolHandle;

    #[test]
    fn set_limits_rejects_bad_bounds() {
        let pool = PoolHandle::create(2).unwrap();
        assert!(matches!(
            pool.set_limits(0, 4),
            Err(Error::ArgumentInvalid { .. })
        ));
        assert!(matches!(
            pool.set_limits(4, 2),
            Err(Error::ArgumentInvalid { .. })
        ));
        pool.shutdown(None).unwrap();
    }

    #[test]
    fn resize_rejects_out_of_range() {
        let pool = PoolHandle::create(2).unwrap();
        let err = pool.resize(100).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
        pool.shutdown(None).unwrap();
    }

    #[test]
    fn resize_to_current_is_a_noop() {
        let pool = PoolHandle::create(3).unwrap();
        pool.resize(3).unwrap();
        assert_eq!(pool.get_stats().thread_count, 3);
        pool.shutdown(None).unwrap();
    }

    #[test]
    fn resize_shrink_is_immediately_visible_in_stats() {
        let pool = PoolHandle::create(4).unwrap();
        pool.resize(2).unwrap();
        assert_eq!(pool.get_stats().thread_count, 2);
        pool.shutdown(None).unwrap();
    }

    #[test]
    fn grow_then_shrink_never_reuses_an_index() {
        // Regression test for the worker-index redesign: shrinking and then growing again must
        // not hand a new worker the same index as a still-retiring old one.
        let pool = PoolHandle::create(4).unwrap();
        pool.resize(2).unwrap();
        pool.resize(3).unwrap();
        assert_eq!(pool.get_stats().thread_count, 3);
        pool.shutdown(None).unwrap();
    }
}
