//! File logging for the `owkit` binary
//!
//! Library crates only emit `tracing` events. Embedders install their own
//! subscriber; the replay binary calls [`init`] so a session leaves a daily
//! log next to the user's other local data.

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "OWKIT_LOG";

const LOG_FILE_PREFIX: &str = "owkit.log";

/// Every owkit crate at `info`, everything else at `warn`
const DEFAULT_DIRECTIVE: &str = "warn,owkit=info,owkit_core=info,owkit_host=info,owkit_app=info";

/// Install the global subscriber writing to `<data_local_dir>/owkit/logs/`.
///
/// Telemetry pushes are only logged when the adapter runs verbose, and then
/// at `debug`, so a replay that needs them is run with:
///
/// ```bash
/// OWKIT_LOG=owkit_app=debug owkit replay session.ndjson --verbose
/// ```
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let writer = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("owkit logging to {}", log_dir.display());
    Ok(())
}

fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("owkit")
        .join("logs")
}
