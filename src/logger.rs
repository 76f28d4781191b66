use serde::Deserialize;
use snafu::ResultExt;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{registry, EnvFilter, Layer};

use crate::config::Config;
use crate::error::{ApplicationError, InitializeLoggerSnafu};

/// How log lines are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// Multi-line output with source locations, for local development.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// One JSON object per line, for containers that collect stdout.
    Json,
    Off,
}

/// Logs to the console and to a daily JSON file in `log_dir`. Keep the guard alive until exit
/// or the last lines of the file are lost.
///
/// `RUST_LOG` picks the levels, `info` when unset.
pub fn init(config: &Config) -> Result<WorkerGuard, ApplicationError> {
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "wetube.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = layer().with_ansi(false).json().with_writer(file_writer);

    let console_layer = match config.log_console {
        ConsoleFormat::Pretty => Some(layer().pretty().with_writer(std::io::stdout).boxed()),
        ConsoleFormat::Compact => Some(
            layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stdout)
                .boxed(),
        ),
        ConsoleFormat::Json => Some(layer().json().with_writer(std::io::stdout).boxed()),
        ConsoleFormat::Off => None,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer);
    tracing::subscriber::set_global_default(subscriber).context(InitializeLoggerSnafu)?;

    Ok(guard)
}
