//! Structured logging for clientrest.
//!
//! This crate owns the two logging concerns of the service:
//!
//! - [`init_logging`] installs the `tracing-subscriber` pipeline once per
//!   process, configured from a [`LogConfig`].
//! - [`Logger`] is the explicit logging capability. It is built once at
//!   process start and handed to the server and middleware constructors,
//!   so no component reaches for a hidden global logger.
//!
//! # Example
//!
//! ```rust,ignore
//! use clientrest_telemetry::{init_logging, LogConfig, Logger};
//!
//! let config = LogConfig::default();
//! init_logging(&config)?;
//!
//! let logger = Logger::new(&config);
//! logger.info("server starting");
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logger;
pub mod logging;

pub use error::TelemetryError;
pub use logger::Logger;
pub use logging::{create_env_filter, init_logging, parse_log_fields, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
