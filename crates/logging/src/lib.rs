//! Global tracing subscriber setup for the SentinelFS daemon.
//!
//! [`init`] installs a process-wide `tracing` subscriber exactly once,
//! deriving its [`tracing::level_filters::LevelFilter`] from a verbosity
//! count (`-v`/`-vv`, as collected by `clap`) and an optional `debug` flag
//! that forces `TRACE` regardless of the count. `RUST_LOG` always takes
//! precedence when set, so operators can filter by subsystem target
//! (`sentinelfs::sync`, `sentinelfs::session`, `sentinelfs::remesh`, ...)
//! without recompiling.
//!
//! ```
//! let options = sentinelfs_logging::LogOptions::default();
//! sentinelfs_logging::init(options).unwrap();
//! tracing::info!(target: "sentinelfs::daemon", "started");
//! ```

use std::sync::Once;

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Verbosity knobs accepted by the daemon's CLI front end.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LogOptions {
    /// Number of `-v` flags supplied; each one raises the default filter by
    /// one step (`WARN` -> `INFO` -> `DEBUG` -> `TRACE`).
    pub verbose: u8,
    /// Forces `TRACE` regardless of `verbose`.
    pub debug: bool,
    /// Suppresses everything but `ERROR`. Takes precedence over both of the
    /// above when set.
    pub quiet: bool,
}

impl LogOptions {
    /// Maps this configuration to a [`LevelFilter`].
    ///
    /// Ignored when `RUST_LOG` is set; see [`init`].
    #[must_use]
    pub fn level_filter(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        if self.debug {
            return LevelFilter::TRACE;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// Failure installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// `tracing_subscriber`'s global default was already set by someone else.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

/// Installs the global `tracing` subscriber.
///
/// Safe to call more than once per process: the first call wins and later
/// calls silently return `Ok(())`, matching the common pattern in binaries
/// that may call `init` from both `main` and an early test harness.
///
/// # Errors
///
/// Returns [`LoggingError::AlreadyInstalled`] if another crate already
/// installed a global default subscriber before this call.
pub fn init(options: LogOptions) -> Result<(), LoggingError> {
    let mut result = Ok(());
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(options.level_filter().to_string()));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            result = Err(LoggingError::AlreadyInstalled);
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_zero_is_warn() {
        assert_eq!(LogOptions::default().level_filter(), LevelFilter::WARN);
    }

    #[test]
    fn verbosity_escalates_with_count() {
        let opts = LogOptions {
            verbose: 1,
            ..Default::default()
        };
        assert_eq!(opts.level_filter(), LevelFilter::INFO);

        let opts = LogOptions {
            verbose: 2,
            ..Default::default()
        };
        assert_eq!(opts.level_filter(), LevelFilter::DEBUG);

        let opts = LogOptions {
            verbose: 9,
            ..Default::default()
        };
        assert_eq!(opts.level_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn debug_flag_forces_trace() {
        let opts = LogOptions {
            verbose: 0,
            debug: true,
            quiet: false,
        };
        assert_eq!(opts.level_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn quiet_overrides_everything() {
        let opts = LogOptions {
            verbose: 3,
            debug: true,
            quiet: true,
        };
        assert_eq!(opts.level_filter(), LevelFilter::ERROR);
    }

    #[test]
    fn init_is_idempotent() {
        assert!(init(LogOptions::default()).is_ok());
        assert!(init(LogOptions::default()).is_ok());
    }
}
