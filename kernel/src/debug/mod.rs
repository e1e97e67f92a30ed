//! Debug output and logging
//!
//! All diagnostics go through the `log` facade; the embedding kernel installs
//! a logger that writes to its console. Scheduler tracing is noisy (one line
//! per priority change) and is compiled in only with `debug-scheduler`.

/// Scheduler trace macro
///
/// Expands to `log::trace!` with the `debug-scheduler` feature and to nothing
/// otherwise. Arguments are still type-checked in both configurations.
#[macro_export]
macro_rules! ksched_debug {
    ($($arg:tt)*) => ({
        if cfg!(feature = "debug-scheduler") {
            log::trace!(target: "sched", $($arg)*);
        }
    });
}
