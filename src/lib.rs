pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod packaging;
pub mod project;
pub mod state;

use config::Config;
use tracing_appender::non_blocking::WorkerGuard;

/// Set up file logging.
///
/// Logs are written to a single, never-rotated file in the OS data dir:
///   Linux    ~/.local/share/beamskin/beamskin.log
///   macOS    ~/Library/Application Support/beamskin/beamskin.log
///   Windows  %LOCALAPPDATA%\beamskin\beamskin.log
///
/// `RUST_LOG` wins over `config.log_filter`. The returned guard flushes the
/// writer on drop, so the binary keeps it alive until exit.
pub fn init_tracing(config: &Config) -> WorkerGuard {
    let log_dir = dirs::data_local_dir().unwrap_or_default().join("beamskin");

    // tracing_appender::rolling::never panics if it cannot open the log file.
    let _ = std::fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::never(&log_dir, "beamskin.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let fallback = config.log_filter.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&fallback))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "BeamSkin starting");
    guard
}
