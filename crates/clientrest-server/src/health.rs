//! Liveness and readiness state.
//!
//! These types hold probe state only; the application decides where to
//! expose them (clientrest serves them under `/v1`). The server flips the
//! shared [`ReadinessCheck`] to not-ready as soon as it starts draining so a
//! load balancer stops sending new traffic.
//!
//! ```rust
//! use clientrest_server::{HealthCheck, ReadinessCheck};
//!
//! let health = HealthCheck::new("clientrest", "0.1.0");
//! assert!(health.status().is_healthy());
//!
//! let readiness = ReadinessCheck::new();
//! let shared = readiness.clone();
//! shared.set_ready(false);
//! assert!(!readiness.is_ready());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Health status document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// "healthy" while the process serves requests.
    status: String,
    service: String,
    version: String,
    uptime_seconds: u64,
}

impl HealthStatus {
    /// Creates a healthy status.
    #[must_use]
    pub fn healthy(service: impl Into<String>, version: impl Into<String>, uptime: Duration) -> Self {
        Self {
            status: "healthy".to_string(),
            service: service.into(),
            version: version.into(),
            uptime_seconds: uptime.as_secs(),
        }
    }

    /// Returns the status string.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the service version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the uptime in seconds.
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.uptime_seconds
    }

    /// Returns whether the status is healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Liveness: healthy as long as the process is up.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
    start_time: Instant,
}

impl HealthCheck {
    /// Creates a health check; uptime is counted from now.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            start_time: Instant::now(),
        }
    }

    /// Returns the current health status.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        HealthStatus::healthy(&self.service, &self.version, self.start_time.elapsed())
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the service version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Readiness status document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadinessStatus {
    ready: bool,
}

impl ReadinessStatus {
    /// Returns whether the service is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Readiness: ready until the server starts draining.
///
/// Clones share the ready flag.
#[derive(Debug, Clone)]
pub struct ReadinessCheck {
    ready: Arc<AtomicBool>,
}

impl ReadinessCheck {
    /// Creates a readiness check; it starts ready.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Sets the shared ready flag.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Returns whether the service is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Returns the readiness status document.
    #[must_use]
    pub fn status(&self) -> ReadinessStatus {
        ReadinessStatus {
            ready: self.is_ready(),
        }
    }
}

impl Default for ReadinessCheck {
    fn default() -> Self {
        Self::new()
    }
}
