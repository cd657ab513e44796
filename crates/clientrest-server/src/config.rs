//! Server configuration types.
//!
//! Built once through [`ServerConfig::builder()`] before the socket is
//! created; immutable afterwards.
//!
//! # Example
//!
//! ```rust
//! use clientrest_server::{ServerConfig, TimeoutProfile};
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .address("0.0.0.0")
//!     .port(9090)
//!     .debug(true)
//!     .build();
//!
//! assert_eq!(config.connection_string(), "0.0.0.0:9090");
//! assert_eq!(config.profile(), TimeoutProfile::Debug);
//! assert_eq!(config.read_timeout(), Duration::from_secs(240));
//! ```

use std::time::Duration;

/// Default bind address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Default port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default drain deadline in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 15;

/// A named set of transport timeouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutProfile {
    /// Read/write 15s, idle 45s.
    #[default]
    Production,
    /// Read/write 240s, idle 500s, for stepping through handlers.
    Debug,
}

impl TimeoutProfile {
    /// Picks the profile for the given debug flag.
    #[must_use]
    pub fn for_debug(debug: bool) -> Self {
        if debug {
            Self::Debug
        } else {
            Self::Production
        }
    }

    /// Time allowed to read a request's headers and body.
    #[must_use]
    pub fn read_timeout(self) -> Duration {
        match self {
            Self::Production => Duration::from_secs(15),
            Self::Debug => Duration::from_secs(240),
        }
    }

    /// Time allowed to produce a response.
    #[must_use]
    pub fn write_timeout(self) -> Duration {
        match self {
            Self::Production => Duration::from_secs(15),
            Self::Debug => Duration::from_secs(240),
        }
    }

    /// Time a keep-alive connection may stay open without a request.
    #[must_use]
    pub fn idle_timeout(self) -> Duration {
        match self {
            Self::Production => Duration::from_secs(45),
            Self::Debug => Duration::from_secs(500),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    address: String,
    port: u16,
    profile: TimeoutProfile,
    read_timeout: Duration,
    write_timeout: Duration,
    idle_timeout: Duration,
    shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the bind address (host part).
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the port. `0` binds an ephemeral port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `address:port`, the string the listener binds to.
    #[must_use]
    pub fn connection_string(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Returns the timeout profile the defaults were taken from.
    #[must_use]
    pub fn profile(&self) -> TimeoutProfile {
        self.profile
    }

    /// Returns the read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns the write timeout.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Returns the idle timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Returns the drain deadline.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
///
/// Explicit timeouts win over the ones implied by the profile, regardless of
/// the order in which `debug` and the timeout setters are called.
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    address: String,
    port: u16,
    debug: bool,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    idle_timeout: Option<Duration>,
    shutdown_timeout: Duration,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            debug: false,
            read_timeout: None,
            write_timeout: None,
            idle_timeout: None,
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }

    /// Sets the bind address (host part).
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Sets the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Selects the debug timeout profile.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Overrides the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Overrides the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Overrides the idle timeout.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Sets the drain deadline.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Builds the [`ServerConfig`].
    #[must_use]
    pub fn build(self) -> ServerConfig {
        let profile = TimeoutProfile::for_debug(self.debug);
        ServerConfig {
            address: self.address,
            port: self.port,
            profile,
            read_timeout: self.read_timeout.unwrap_or_else(|| profile.read_timeout()),
            write_timeout: self.write_timeout.unwrap_or_else(|| profile.write_timeout()),
            idle_timeout: self.idle_timeout.unwrap_or_else(|| profile.idle_timeout()),
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
