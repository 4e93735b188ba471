//! Swaps `std::sync`/`std::thread` for `loom`'s equivalents under `cfg(loom)`.
//!
//! The worker pool's locking discipline (resize mutex strictly outside the pool mutex, no lock
//! held across user task execution) is exactly the kind of thing that is easy to get subtly wrong
//! and hard to catch with ordinary tests. Routing every primitive through this module lets the
//! pool's own test suite run the same code under `loom::model` to exhaustively check interleavings
//! instead of hoping a normal multi-threaded test happens to hit the bad schedule.
#[cfg(not(loom))]
mod not_loom {
    pub use std::sync::atomic::*;
    pub use std::sync::*;
    pub use std::thread::{current, park, park_timeout, sleep, spawn, JoinHandle, Thread};

    pub use std::hint::spin_loop;

    /// Run `what` directly under ordinary threads, or (under `cfg(loom)`, see below) under loom's
    /// model checker. Not gated to this crate's own tests: it's meant to be called from
    /// `workerpool`'s test suite too, so both crates exercise the same code under both configurations.
    pub fn wrap_test(what: impl Fn() + Sync + Send + 'static) {
        what()
    }
}

#[cfg(not(loom))]
pub use not_loom::*;

#[cfg(loom)]
mod with_loom {
    pub use loom::sync::atomic::*;
    pub use loom::sync::*;
    pub use loom::thread::{current, park, sleep, spawn, yield_now, JoinHandle, Thread};

    pub use loom::hint::spin_loop;

    /// Loom has no `park_timeout`; model checking assumes a bounded-wait loop behaves the same as
    /// an unbounded one modulo eventually observing the predicate, so we substitute a yield.
    pub fn park_timeout(_timeout: std::time::Duration) {
        yield_now();
    }

    /// See the `not_loom` sibling: under `cfg(loom)` this routes through `loom::model` instead of
    /// running directly.
    pub fn wrap_test(what: impl Fn() + Sync + Send + 'static) {
        loom::model(what);
    }
}

#[cfg(loom)]
pub use with_loom::*;
