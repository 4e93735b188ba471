use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// A pool-wide unique task identifier.
///
/// Monotonically increasing, unique within one [`crate::PoolHandle`], and never zero: zero is
/// reserved by the public API to mean "no such task" (see [`crate::PoolHandle::find_by_name`]).
/// Wrapping the id in `NonZeroU64` gives us that "never zero" guarantee for free and means
/// `Option<TaskId>` costs nothing extra over `TaskId` itself.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Hash, Debug)]
pub struct TaskId(NonZeroU64);

impl TaskId {
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-pool monotonic id allocator.
///
/// Each [`crate::PoolInner`] owns one of these; ids are never reused and never shared across pool
/// instances, matching the spec's "unique within a pool instance" requirement.
pub(crate) struct TaskIdAllocator {
    next: AtomicU64,
}

impl TaskIdAllocator {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub(crate) fn allocate(&self) -> TaskId {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        TaskId(NonZeroU64::new(raw).expect("counter starts at 1 and only increases"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let alloc = TaskIdAllocator::new();
        assert_eq!(alloc.allocate().get(), 1);
        assert_eq!(alloc.allocate().get(), 2);
        assert_eq!(alloc.allocate().get(), 3);
    }

    proptest::proptest! {
        /// Invariant 6: allocated ids are strictly increasing and never zero, for any number of
        /// allocations from a fresh allocator.
        #[test]
        fn ids_are_strictly_increasing_and_nonzero(n in 0usize..500) {
            let alloc = TaskIdAllocator::new();
            let mut last = 0u64;
            for _ in 0..n {
                let id = alloc.allocate();
                proptest::prop_assert!(id.get() > 0);
                proptest::prop_assert!(id.get() > last);
                last = id.get();
            }
        }
    }

    /// Invariant 6 under real concurrency: ids handed out across threads are still unique and
    /// never zero, even though the order between threads is unspecified.
    #[test]
    fn ids_are_unique_across_threads() {
        use std::collections::HashSet;
        use std::sync::{Arc, Mutex};

        let alloc = Arc::new(TaskIdAllocator::new());
        let seen = Arc::new(Mutex::new(HashSet::new()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let alloc = Arc::clone(&alloc);
                let seen = Arc::clone(&seen);
                std::thread::spawn(move || {
                    let mut mine = Vec::with_capacity(200);
                    for _ in 0..200 {
                        mine.push(alloc.allocate().get());
                    }
                    seen.lock().unwrap().extend(mine);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 8 * 200);
        assert!(!seen.contains(&0));
    }
}
