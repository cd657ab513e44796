//! The typed service the `/v1` handlers are called with.

use clientrest_server::{HealthCheck, HealthStatus, ReadinessCheck, ReadinessStatus};

/// What the API handlers need from the application.
pub trait ApiService: Send + Sync + 'static {
    /// Liveness document served by `GET /v1/health`.
    fn health(&self) -> HealthStatus;

    /// Readiness document served by `GET /v1/ready`.
    fn readiness(&self) -> ReadinessStatus;
}

/// The production service: probe state only, no business logic.
#[derive(Debug, Clone)]
pub struct AppService {
    health: HealthCheck,
    readiness: ReadinessCheck,
}

impl AppService {
    /// Creates the service. `readiness` should be the same check handed to
    /// the server so `/v1/ready` turns unavailable while draining.
    #[must_use]
    pub fn new(health: HealthCheck, readiness: ReadinessCheck) -> Self {
        Self { health, readiness }
    }
}

impl ApiService for AppService {
    fn health(&self) -> HealthStatus {
        self.health.status()
    }

    fn readiness(&self) -> ReadinessStatus {
        self.readiness.status()
    }
}
