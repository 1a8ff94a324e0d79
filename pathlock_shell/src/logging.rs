//! # Logging Initialization
//!
//! `init_logging()` installs the global `tracing` subscriber once per process.
//!
//! - The filter comes from `RUST_LOG` when set, otherwise from the level the
//!   caller passes.
//! - By default logs go to stderr with ANSI colors.
//! - With `log_to_file`, logs go to a daily rolling file in the user's cache
//!   directory (`directories::ProjectDirs`) without colors. If that directory
//!   cannot be found or written, logging falls back to stderr.
//!
//! Log before locking: once the process is restricted, the cache directory is
//! only reachable if a rule allows it. An already-open log file keeps working.

use anyhow::Result;
use directories::ProjectDirs;
use std::{io::stderr, path::Path, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

pub const LOG_FILE_PREFIX: &str = "pathlock.log";

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "Pathlock", "pathlock")
}

/// Initializes the logging system. Later calls are no-ops.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        if log_to_file && let Some(dirs) = project_dirs() {
            let log_dir = dirs.cache_dir();

            // tracing_appender::rolling::daily panics on permission errors.
            let file_appender = if can_write_to(log_dir) {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX)
                }))
                .ok()
            } else {
                None
            };

            if let Some(file_appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(non_blocking).with_ansi(false))
                    .init();
                // Leaked so buffered lines are flushed at exit.
                Box::leak(Box::new(guard));
                return;
            }
        }

        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer().with_writer(stderr).with_ansi(true))
            .init();
    });

    Ok(())
}

/// Create `dir` if needed and check a file can be written there.
fn can_write_to(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let test_file = dir.join(".pathlock_log_test");
    match std::fs::write(&test_file, "test") {
        Ok(()) => {
            let _ = std::fs::remove_file(&test_file);
            true
        }
        Err(_) => false,
    }
}
