//! The explicit logging capability.
//!
//! A [`Logger`] is built once at process start and passed by value (it is
//! cheap to clone) into every component that logs outside a request: the
//! server lifecycle and the middleware constructors. Every record it emits is
//! parented to a root span carrying the service name and the static
//! `LOG_FIELDS`, so those fields appear on each line without any global state
//! beyond the installed subscriber.
//!
//! The root span is created at `ERROR` level so that no level filter can
//! disable it; a disabled parent would strip its fields from every record.

use std::fmt::Display;

use tracing::{Level, Span};

use crate::logging::LogConfig;

/// Leveled logging sink with `info`, `warn`, `error` and `fatal` operations.
#[derive(Debug, Clone)]
pub struct Logger {
    span: Span,
    enabled: bool,
}

impl Logger {
    /// Creates a logger whose records carry the configured service name and
    /// static fields.
    #[must_use]
    pub fn new(config: &LogConfig) -> Self {
        let span = tracing::span!(
            Level::ERROR,
            "service",
            service = %config.service_name,
            fields = %config.fields_display(),
        );
        Self {
            span,
            enabled: config.enabled,
        }
    }

    /// Creates a logger that discards everything. Used in tests.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            span: Span::none(),
            enabled: false,
        }
    }

    /// Returns whether records are emitted.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the root span; request spans are created as its children.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Logs at info level.
    pub fn info(&self, message: impl Display) {
        if self.enabled {
            tracing::info!(parent: &self.span, "{}", message);
        }
    }

    /// Logs at warn level.
    pub fn warn(&self, message: impl Display) {
        if self.enabled {
            tracing::warn!(parent: &self.span, "{}", message);
        }
    }

    /// Logs at error level.
    pub fn error(&self, message: impl Display) {
        if self.enabled {
            tracing::error!(parent: &self.span, "{}", message);
        }
    }

    /// Logs an unrecoverable error and terminates the process with status 1.
    pub fn fatal(&self, message: impl Display) -> ! {
        if self.enabled {
            tracing::error!(parent: &self.span, fatal = true, "{}", message);
        }
        std::process::exit(1)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(&LogConfig::default())
    }
}
