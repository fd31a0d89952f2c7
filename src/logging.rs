//! Logging configuration.
//!
//! Sets up tracing-based logging to stderr, with an optional daily rolling
//! log file and, on Linux, optional forwarding to systemd's journal.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize the logging system.
///
/// Log level can be controlled via the `SONGPLAY_ETL_LOG` environment variable:
/// - `SONGPLAY_ETL_LOG=debug` for per-record output
/// - `SONGPLAY_ETL_LOG=info` for per-file progress (default)
/// - `SONGPLAY_ETL_LOG=warn` for skipped records and files only
/// - `SONGPLAY_ETL_LOG=error` for errors only
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_env("SONGPLAY_ETL_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &config.dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "songplay-etl.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The worker guard must outlive every log call; init() runs once.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    #[cfg(target_os = "linux")]
    let journald_layer = if config.journald {
        tracing_journald::layer().ok()
    } else {
        None
    };
    #[cfg(not(target_os = "linux"))]
    let journald_layer: Option<tracing_subscriber::layer::Identity> = None;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(journald_layer)
        .init();

    if let Some(dir) = &config.dir {
        tracing::debug!("Logging to {:?}", dir);
    }
    Ok(())
}
