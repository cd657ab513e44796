//! # clientrest
//!
//! A REST service scaffold. The [`domain`] module owns the typed service and
//! the `/v1` routes; [`bootstrap`] wires them into a
//! [`clientrest_server::Server`] from a loaded
//! [`clientrest_config::AppConfig`].
//!
//! ```rust,no_run
//! use clientrest::bootstrap::build_server;
//! use clientrest_config::ConfigLoader;
//! use clientrest_telemetry::Logger;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().with_env()?.load()?;
//! let logger = Logger::new(&config.log_config());
//!
//! build_server(&config, logger).listen().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod domain;

/// Version reported by `/v1/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
