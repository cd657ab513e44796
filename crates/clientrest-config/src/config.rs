//! Configuration types.
//!
//! Every section rejects unknown fields, so a typo in a configuration file is
//! a load error instead of a silently ignored setting.

use std::collections::BTreeMap;

use clientrest_telemetry::{create_env_filter, LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Complete clientrest configuration.
///
/// ```
/// use clientrest_config::AppConfig;
///
/// let config = AppConfig::default();
/// assert_eq!(config.server.address, "127.0.0.1");
/// assert_eq!(config.server.port, 8080);
/// assert!(!config.debug);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Selects the extended debug timeout profile.
    #[serde(default)]
    pub debug: bool,

    /// Listening socket settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Logging settings.
    #[serde(default)]
    pub log: LogSection,
}

/// Listening socket settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address (host part).
    pub address: String,

    /// Bind port.
    pub port: u16,

    /// Drain deadline in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
            shutdown_timeout_secs: 15,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// `EnvFilter` directive.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Static fields attached to every log record.
    pub fields: BTreeMap<String, String>,

    /// Service name recorded on every log record.
    pub service_name: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            fields: BTreeMap::new(),
            service_name: "clientrest".to_string(),
        }
    }
}

impl AppConfig {
    /// Checks the values a server cannot start with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::invalid_value("server.address", "must not be empty"));
        }

        if self.server.port == 0 {
            return Err(ConfigError::invalid_value("server.port", "must not be 0"));
        }

        if self.server.shutdown_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.shutdown_timeout_secs",
                "must be greater than 0",
            ));
        }

        if let Err(e) = create_env_filter(&self.log.level) {
            return Err(ConfigError::invalid_value("log.level", e.to_string()));
        }

        Ok(())
    }

    /// Returns the logging configuration for [`clientrest_telemetry::init_logging`].
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            enabled: true,
            level: self.log.level.clone(),
            format: self.log.format,
            fields: self
                .log
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            service_name: self.log.service_name.clone(),
        }
    }
}
