use crate::task_name::TaskName;

/// Errors returned by the public pool API.
///
/// This mirrors the language-neutral error taxonomy: each variant is a *kind*, not a wrapper
/// around some lower-level type, because the pool itself is the only thing that can fail here
/// (there is no I/O, no parsing, no network).
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("argument invalid: {reason}")]
    ArgumentInvalid { reason: &'static str },

    #[error("operation invalid: the pool is shutting down or has already shut down")]
    StateInvalid,

    #[error("resize target {target} is outside the current bounds [{min}, {max}]")]
    OutOfRange {
        target: usize,
        min: usize,
        max: usize,
    },

    #[error("failed to spawn a worker thread: {message}")]
    SpawnFailed { message: String },

    #[error("no task found matching the given id or name")]
    NotFound,

    #[error("task \"{name}\" is currently running and cannot be cancelled")]
    RunningNotCancellable { name: TaskName },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
