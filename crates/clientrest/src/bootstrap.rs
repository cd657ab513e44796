//! Turns a loaded [`AppConfig`] into a ready-to-listen [`Server`].

use std::time::Duration;

use clientrest_config::AppConfig;
use clientrest_server::{HealthCheck, ReadinessCheck, Server, ServerConfig};
use clientrest_telemetry::Logger;

use crate::domain::{ApiRouter, AppService};
use crate::VERSION;

/// Maps the `[server]` section and the debug flag onto a [`ServerConfig`].
#[must_use]
pub fn server_config(config: &AppConfig) -> ServerConfig {
    ServerConfig::builder()
        .address(config.server.address.clone())
        .port(config.server.port)
        .debug(config.debug)
        .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
        .build()
}

/// Builds the service, loads the API and wires both into a server.
///
/// The readiness check is shared between `/v1/ready` and the server, so the
/// endpoint reports unavailable as soon as draining starts.
#[must_use]
pub fn build_server(config: &AppConfig, logger: Logger) -> Server {
    let readiness = ReadinessCheck::new();
    let health = HealthCheck::new(config.log.service_name.clone(), VERSION);
    let service = AppService::new(health, readiness.clone());

    let mut api = ApiRouter::new(service, logger.clone());
    api.load_api();

    Server::builder()
        .config(server_config(config))
        .router(api.into_router())
        .readiness(readiness)
        .logger(logger)
        .build()
}
