//! Logging setup for hosts embedding the state core
//!
//! The core only emits `tracing` events. Hosts that do not install their own
//! subscriber can use these helpers to get readable output, or keep the
//! default silent mode.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber is installed
    Silent,
    /// Compact stderr output
    Development,
    /// Verbose output with source locations
    Debug,
    /// One JSON object per line, for hosts that ship logs elsewhere
    Json,
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
}

/// Initialize logging with the specified mode
///
/// # Environment Variables
///
/// - `ALEXA_LOG_LEVEL`: filter directive (e.g. `debug` or `alexa_state=trace`)
/// - `RUST_LOG`: used when `ALEXA_LOG_LEVEL` is not set
///
/// ```rust,ignore
/// alexa_state::logging::init_logging(LoggingMode::Development)?;
/// ```
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter("info")?;
            Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .compact(),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter("debug")?;
            Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Json => {
            let filter = create_env_filter("info")?;
            Registry::default()
                .with(fmt::layer().json().with_current_span(false))
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Initialize logging from `ALEXA_LOG_MODE`
///
/// Accepts `development`, `debug` and `json`; anything else is silent.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = parse_mode(std::env::var("ALEXA_LOG_MODE").ok().as_deref());
    init_logging(mode)
}

fn parse_mode(value: Option<&str>) -> LoggingMode {
    match value {
        Some("development") => LoggingMode::Development,
        Some("debug") => LoggingMode::Debug,
        Some("json") => LoggingMode::Json,
        _ => LoggingMode::Silent,
    }
}

/// ALEXA_LOG_LEVEL, then RUST_LOG, then the mode default
fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var("ALEXA_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter(e.to_string()))
}

/// Whether a global subscriber is already installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
