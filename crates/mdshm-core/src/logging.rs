//! Logging initialization using the `tracing` ecosystem.
//!
//! - Console output on stderr (colored when stderr is a terminal)
//! - Optional file output with daily rotation via `tracing-appender`
//! - `RUST_LOG` overrides the level passed in

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber. Call once at program start.
///
/// - `log_level`: default filter when `RUST_LOG` is unset (e.g. `"info"`)
/// - `log_dir`: directory for daily-rotating log files, if any
/// - `file_prefix`: log file name prefix (e.g. `"mdshm-collector"`)
pub fn init_logging(log_level: &str, log_dir: Option<&str>, file_prefix: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal());

    let file_layer = log_dir.map(|dir| {
        fmt::layer()
            .with_writer(tracing_appender::rolling::daily(dir, file_prefix))
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}
