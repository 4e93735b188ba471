//! Synchronization primitives shared by the worker pool crate.
//!
//! This is a private dependency of `workerpool`; the only thing it provides today is [`sync`], a
//! thin re-export layer that swaps in `loom`'s mutex/condvar/thread types under `cfg(loom)` so the
//! pool's concurrency engine can be exercised under model checking as well as under real threads.
pub mod sync;
