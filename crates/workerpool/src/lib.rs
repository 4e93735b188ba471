//! A priority-aware, dynamically resizable thread pool with per-worker introspection.
//!
//! Producers submit opaque units of work ([`PoolHandle::submit`]); a bounded set of worker
//! threads dispatches them in priority-then-FIFO order. The pool can be resized manually
//! ([`PoolHandle::resize`]) or left to an optional auto-adjust controller that grows and shrinks
//! it in response to queue depth and idle count ([`PoolHandle::enable_auto_adjust`]).
//!
//! This crate never installs a global logger itself; call [`log_setup::init_from_env`] once at
//! process startup (a binary or test, never library code) if you want to see its `log` records.

mod auto_adjust;
pub mod error;
pub mod log_setup;
mod pool;
mod priority;
mod queue;
mod state;
mod stats;
mod task;
mod task_id;
mod task_name;
mod worker;
mod worker_loop;

pub use error::{Error, Result};
pub use pool::{DrainReport, PoolHandle, TaskLocation};
pub use priority::Priority;
pub use stats::Stats;
pub use task::{CancelCallback, TaskArgument, TaskFn};
pub use task_id::TaskId;
pub use task_name::TaskName;
