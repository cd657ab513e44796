//! The versioned API.

use clientrest_endpoint::{with_error, ContentTypeJson, Recovery, RequestLogging};
use clientrest_server::Router;
use clientrest_telemetry::Logger;

use super::handlers;
use super::service::ApiService;

/// Current API version prefix.
pub const API_V1: &str = "/v1";

/// Composes the service's routes and middleware.
///
/// Every request passes through the global chain, outermost first:
/// content type, panic recovery, request logging.
///
/// ```
/// use clientrest::domain::{ApiRouter, AppService};
/// use clientrest_server::{HealthCheck, ReadinessCheck};
/// use clientrest_telemetry::Logger;
///
/// let service = AppService::new(HealthCheck::new("clientrest", "0.1.0"), ReadinessCheck::new());
/// let mut api = ApiRouter::new(service, Logger::disabled());
/// api.load_api();
///
/// assert_eq!(api.get_router().route_count(), 2);
/// ```
pub struct ApiRouter<S> {
    router: Router<S>,
    logger: Logger,
    loaded: bool,
}

impl<S: ApiService> ApiRouter<S> {
    /// Creates a router with no routes; call [`load_api`](Self::load_api).
    #[must_use]
    pub fn new(service: S, logger: Logger) -> Self {
        Self {
            router: Router::new(service),
            logger,
            loaded: false,
        }
    }

    /// Installs the global middleware and mounts every API version.
    ///
    /// Calling it again is a no-op.
    pub fn load_api(&mut self) -> &mut Self {
        if self.loaded {
            return self;
        }
        self.loaded = true;

        self.router
            .layer(ContentTypeJson::new())
            .layer(Recovery::new(self.logger.clone()))
            .layer(RequestLogging::new(self.logger.clone()));

        self.api_v1();
        self
    }

    fn api_v1(&mut self) {
        self.router
            .group(API_V1)
            .get("/health", with_error(handlers::health::<S>))
            .get("/ready", with_error(handlers::ready::<S>));
    }

    /// Returns the composed router.
    #[must_use]
    pub fn get_router(&self) -> &Router<S> {
        &self.router
    }

    /// Hands the composed router over to the server.
    #[must_use]
    pub fn into_router(self) -> Router<S> {
        self.router
    }
}

impl<S> std::fmt::Debug for ApiRouter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRouter")
            .field("router", &self.router)
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}
