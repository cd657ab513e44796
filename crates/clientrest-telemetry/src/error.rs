//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while configuring logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A `LOG_FIELDS` entry could not be parsed.
    #[error("Invalid log field '{0}': expected key=value")]
    InvalidField(String),
}
