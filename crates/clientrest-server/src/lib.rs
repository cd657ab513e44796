//! # clientrest server
//!
//! The transport half of clientrest: owns the listening socket, routes
//! requests through the middleware chain to handlers, and supervises the
//! process lifecycle.
//!
//! - [`ServerConfig`] - bind address and the production/debug timeout profiles
//! - [`Router`] - versioned route groups with global and per-group middleware
//! - [`Server`] - `Configured → Listening → Draining → Stopped`
//! - [`ShutdownSignal`] - a cancellation token triggered at most once
//! - [`HealthCheck`] / [`ReadinessCheck`] - probe state
//!
//! ## Example
//!
//! ```rust,ignore
//! use clientrest_server::{Router, Server, ServerConfig};
//!
//! let router = Router::new(service);
//! let server = Server::builder()
//!     .config(ServerConfig::builder().port(8080).build())
//!     .router(router)
//!     .logger(logger)
//!     .build();
//!
//! server.listen().await?;
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod connection;

pub mod config;
pub mod error;
pub mod health;
pub mod router;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder, TimeoutProfile};
pub use error::ServerError;
pub use health::{HealthCheck, HealthStatus, ReadinessCheck, ReadinessStatus};
pub use router::{Dispatch, RouteGroup, Router};
pub use server::{LifecycleState, Server, ServerBuilder};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownReceiver, ShutdownSignal};
