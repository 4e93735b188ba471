/// A consistent snapshot of pool counters, taken under the pool mutex.
///
/// Like any snapshot of concurrent state, it may be stale the instant the call that produced it
/// returns; see §5's note on introspection.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Stats {
    pub thread_count: usize,
    pub min_threads: usize,
    pub max_threads: usize,
    pub idle_threads: usize,
    pub queue_size: usize,
    pub started: usize,
}
