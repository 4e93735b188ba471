//! Logging bootstrap for binaries and tests that embed this pool.
//!
//! The pool's own modules log through the ordinary `log` facade (`log::info!` and friends) and
//! never install a subscriber themselves -- doing so from library code would silently steal the
//! logger out from under whatever the embedding application already configured. Call
//! [`init_from_env`] once, near the top of `main` (or at the top of a test binary), to wire up an
//! `env_logger` subscriber whose minimum severity comes from `LOG_LEVEL`.

use log::LevelFilter;

const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

/// Parse the `LOG_LEVEL` environment variable into a `log` severity filter.
///
/// Recognizes `FATAL|ERROR|WARN|INFO|DEBUG|TRACE`, case-insensitively. `FATAL` maps to `log`'s
/// `Error` level, since the `log` crate has no separate fatal tier. Unset or unrecognized values
/// fall back to [`DEFAULT_LEVEL`].
fn level_from_env() -> LevelFilter {
    match std::env::var("LOG_LEVEL") {
        Ok(raw) => match raw.to_ascii_uppercase().as_str() {
            "FATAL" | "ERROR" => LevelFilter::Error,
            "WARN" => LevelFilter::Warn,
            "INFO" => LevelFilter::Info,
            "DEBUG" => LevelFilter::Debug,
            "TRACE" => LevelFilter::Trace,
            other => {
                eprintln!(
                    "workerpool: LOG_LEVEL={other:?} not recognized, defaulting to {DEFAULT_LEVEL}"
                );
                DEFAULT_LEVEL
            }
        },
        Err(_) => DEFAULT_LEVEL,
    }
}

/// Install an `env_logger` subscriber filtered by `LOG_LEVEL` (default `INFO`).
///
/// Safe to call more than once; later calls are no-ops (`env_logger::Builder::try_init` reports
/// the logger is already set, which we ignore). Never called automatically by this crate.
pub fn init_from_env() {
    let _ = env_logger::Builder::new()
        .filter_level(level_from_env())
        .is_test(cfg!(test))
        .try_init();
}
