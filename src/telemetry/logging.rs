//! Logging configuration and initialization
//!
//! Library modules log through the `log` facade; records are collected by a
//! tracing subscriber with console, JSON or file output.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "GESTURE_OSC_LOG";

/// Environment variable selecting the output format ("json")
pub const LOG_FORMAT_ENV: &str = "GESTURE_OSC_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Write logs to this file as well (default: None)
    pub file_path: Option<PathBuf>,
    /// Use JSON format for console logs (default: false)
    pub json_format: bool,
    /// Default log level filter (default: "info")
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_path: None,
            json_format: false,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Whether JSON output is requested, from the environment or the config
    pub fn use_json(&self) -> bool {
        json_requested(std::env::var(LOG_FORMAT_ENV).ok().as_deref(), self.json_format)
    }
}

fn json_requested(env_value: Option<&str>, fallback: bool) -> bool {
    env_value
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(fallback)
}

/// What the console layer prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleFormat {
    Off,
    Compact,
    Json,
}

impl ConsoleFormat {
    /// Console format for `config`; independent of file output
    pub fn select(config: &LogConfig, use_json: bool) -> Self {
        match (config.console_enabled, use_json) {
            (false, _) => ConsoleFormat::Off,
            (true, true) => ConsoleFormat::Json,
            (true, false) => ConsoleFormat::Compact,
        }
    }
}

/// Initialize the logging system with the given configuration
///
/// Returns a guard that must be kept alive for the duration of the program
/// so file logging is flushed.
///
/// `GESTURE_OSC_LOG` sets the filter (falls back to `RUST_LOG`, then to
/// `default_level`). `GESTURE_OSC_LOG_FORMAT=json` switches console output
/// to JSON lines, with or without a log file. The file itself is always
/// plain text.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let use_json = config.use_json();
    let console = ConsoleFormat::select(config, use_json);

    let (file_layer, file_guard) = match &config.file_path {
        Some(log_path) => {
            let file = std::fs::File::create(log_path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            eprintln!("Logging to file: {}", log_path.display());
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_layer = (console == ConsoleFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
    });
    let compact_layer =
        (console == ConsoleFormat::Compact).then(|| fmt::layer().with_target(true).compact());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(json_layer)
        .with(compact_layer)
        .try_init()?;

    tracing::info!(
        target: "gesture_osc",
        version = env!("CARGO_PKG_VERSION"),
        json_format = use_json,
        file_enabled = config.file_path.is_some(),
        "Logging initialized"
    );

    Ok(file_guard)
}
