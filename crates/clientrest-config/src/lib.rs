//! Typed configuration for clientrest.
//!
//! Configuration is layered (defaults → file → `.env` → environment) and
//! validated once at startup; a server never starts on a configuration it
//! could not bind with.
//!
//! # Example
//!
//! ```no_run
//! use clientrest_config::ConfigLoader;
//!
//! # fn main() -> Result<(), clientrest_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("clientrest.toml")?
//!     .with_dotenv()?
//!     .with_env()?
//!     .load()?;
//!
//! println!("listening on {}:{}", config.server.address, config.server.port);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! debug = false
//!
//! [server]
//! address = "127.0.0.1"
//! port = 8080
//! shutdown_timeout_secs = 15
//!
//! [log]
//! level = "info"
//! format = "json"
//! service_name = "clientrest"
//!
//! [log.fields]
//! component = "api"
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{AppConfig, LogSection, ServerSection};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX};
