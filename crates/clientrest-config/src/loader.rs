//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, a `.env` file and environment variables.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

use clientrest_telemetry::{parse_log_fields, LogFormat};

use crate::config::AppConfig;
use crate::error::{ConfigError, ConfigResult};

/// Prefix of the namespaced environment variables.
pub const ENV_PREFIX: &str = "CLIENTREST";

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values
/// 2. Configuration file (TOML or JSON)
/// 3. `.env` file (never overrides a variable that is already set)
/// 4. Environment variables
///
/// # Example
///
/// ```no_run
/// use clientrest_config::ConfigLoader;
///
/// # fn main() -> Result<(), clientrest_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("clientrest.toml")?
///     .with_dotenv()?
///     .with_env()?
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: AppConfig,
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file.
    ///
    /// The format is picked from the extension (`.toml` or `.json`).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.config = parse(&content, &extension)?;

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format ("toml" or "json").
    ///
    /// ```
    /// use clientrest_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nport = 9090\n", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.port, 9090);
    /// assert_eq!(config.server.address, "127.0.0.1");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> ConfigResult<Self> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Loads `./.env` into the process environment, if present.
    pub fn with_dotenv(self) -> ConfigResult<Self> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads the given `.env`-style file into the process environment.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Applies the process environment.
    ///
    /// Variables that are not valid UTF-8 are skipped, unless they are one of
    /// the recognised variables, which is an error.
    pub fn with_env(self) -> ConfigResult<Self> {
        self.apply_env_os(env::vars_os())
    }

    /// Applies environment overrides from raw OS strings.
    pub fn apply_env_os<I>(self, vars: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut utf8 = Vec::new();
        for (key, value) in vars {
            let Ok(key) = key.into_string() else {
                continue;
            };
            match value.into_string() {
                Ok(value) => utf8.push((key, value)),
                Err(_) if is_recognised(&key) => {
                    return Err(ConfigError::env_parse_error(key, "value is not valid UTF-8"));
                }
                Err(_) => {}
            }
        }
        self.apply_env(utf8)
    }

    /// Applies environment overrides from `vars`.
    ///
    /// Recognised variables:
    /// - `DEBUG`: any non-empty value enables debug mode
    /// - `LOG_LEVEL`, `LOG_FORMAT` (`json` or `pretty`), `LOG_FIELDS` (`[key=value,...]`)
    /// - `CLIENTREST__SERVER__ADDRESS`, `CLIENTREST__SERVER__PORT`,
    ///   `CLIENTREST__SERVER__SHUTDOWN_TIMEOUT_SECS`
    ///
    /// Anything else is ignored.
    ///
    /// ```
    /// use clientrest_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .apply_env([
    ///         ("DEBUG".to_string(), "1".to_string()),
    ///         ("CLIENTREST__SERVER__PORT".to_string(), "9000".to_string()),
    ///     ])
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.debug);
    /// assert_eq!(config.server.port, 9000);
    /// ```
    pub fn apply_env<I>(mut self, vars: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            self.apply_env_var(&key, &value)?;
        }
        Ok(self)
    }

    /// Finalize and validate the configuration.
    pub fn load(self) -> ConfigResult<AppConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> AppConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        match key {
            "DEBUG" => self.config.debug = !value.is_empty(),
            "LOG_LEVEL" => self.config.log.level = value.to_string(),
            "LOG_FORMAT" => {
                self.config.log.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            "LOG_FIELDS" => {
                let fields = parse_log_fields(value)
                    .map_err(|e| ConfigError::env_parse_error(key, e.to_string()))?;
                self.config.log.fields.extend(fields);
            }
            _ => self.apply_namespaced(key, value)?,
        }
        Ok(())
    }

    fn apply_namespaced(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let Some(rest) = key
            .strip_prefix(ENV_PREFIX)
            .and_then(|k| k.strip_prefix("__"))
        else {
            return Ok(());
        };

        let parts: Vec<&str> = rest.split("__").collect();
        match parts.as_slice() {
            ["SERVER", "ADDRESS"] => self.config.server.address = value.to_string(),
            ["SERVER", "PORT"] => {
                self.config.server.port = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected port number"))?;
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                self.config.server.shutdown_timeout_secs = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            ["LOG", "SERVICE_NAME"] => self.config.log.service_name = value.to_string(),
            _ => {}
        }
        Ok(())
    }
}

fn is_recognised(key: &str) -> bool {
    matches!(key, "DEBUG" | "LOG_LEVEL" | "LOG_FORMAT" | "LOG_FIELDS")
        || key
            .strip_prefix(ENV_PREFIX)
            .is_some_and(|rest| rest.starts_with("__"))
}

fn parse(content: &str, format: &str) -> ConfigResult<AppConfig> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.server.shutdown_timeout_secs, 15);
    }

    #[test]
    fn test_toml_file() {
        let file = temp_file(
            ".toml",
            r#"
                debug = true

                [server]
                address = "0.0.0.0"
                port = 9090

                [log]
                level = "debug"
                format = "pretty"

                [log.fields]
                team = "core"
            "#,
        );

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert!(config.debug);
        assert_eq!(config.server.address, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.shutdown_timeout_secs, 15);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.log.fields.get("team").map(String::as_str), Some("core"));
    }

    #[test]
    fn test_json_file() {
        let file = temp_file(".json", r#"{ "server": { "port": 7070 } }"#);
        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.server.port, 7070);
    }

    #[test]
    fn test_unknown_field_in_file() {
        let file = temp_file(".toml", "[server]\nlisten = \"0.0.0.0:80\"\n");
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = temp_file(".yaml", "server: {}\n");
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(matches!(
            ConfigLoader::new().with_file(&path),
            Err(ConfigError::FileNotFound { .. })
        ));
        assert!(ConfigLoader::new().with_optional_file(&path).is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = temp_file(".toml", "[server]\nport = 9090\n");
        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .apply_env(vars(&[
                ("CLIENTREST__SERVER__PORT", "9191"),
                ("CLIENTREST__SERVER__ADDRESS", "10.0.0.1"),
                ("CLIENTREST__SERVER__SHUTDOWN_TIMEOUT_SECS", "5"),
                ("LOG_LEVEL", "warn"),
                ("LOG_FORMAT", "PRETTY"),
                ("HOME", "/root"),
            ]))
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.server.port, 9191);
        assert_eq!(config.server.address, "10.0.0.1");
        assert_eq!(config.server.shutdown_timeout_secs, 5);
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_debug_flag() {
        let config = ConfigLoader::new()
            .apply_env(vars(&[("DEBUG", "false")]))
            .unwrap()
            .load_unvalidated();
        assert!(config.debug, "any non-empty value enables debug");

        let config = ConfigLoader::new()
            .apply_env(vars(&[("DEBUG", "")]))
            .unwrap()
            .load_unvalidated();
        assert!(!config.debug);

        let config = ConfigLoader::new()
            .apply_env(vars(&[("DEBUG", " ")]))
            .unwrap()
            .load_unvalidated();
        assert!(config.debug, "whitespace is a non-empty value");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_env() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = |bytes: &[u8]| OsStr::from_bytes(bytes).to_os_string();

        let config = ConfigLoader::new()
            .apply_env_os([
                (raw(b"UNRELATED"), raw(b"\xff\xfe")),
                (raw(b"\xffKEY"), raw(b"1")),
                (OsString::from("CLIENTREST__SERVER__PORT"), OsString::from("9300")),
            ])
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.port, 9300);

        let result = ConfigLoader::new()
            .apply_env_os([(OsString::from("LOG_LEVEL"), raw(b"\xff\xfe"))]);
        assert!(matches!(result, Err(ConfigError::EnvParseError { var, .. }) if var == "LOG_LEVEL"));

        env::set_var("CLIENTREST_CONFIG_TEST_NON_UTF8", raw(b"\xff\xfe"));
        let result = ConfigLoader::new().with_env();
        env::remove_var("CLIENTREST_CONFIG_TEST_NON_UTF8");
        assert!(result.is_ok());
    }

    #[test]
    fn test_log_fields() {
        let config = ConfigLoader::new()
            .apply_env(vars(&[("LOG_FIELDS", "[env=prod, region=eu-west-1]")]))
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.log.fields.len(), 2);
        assert_eq!(config.log.fields["region"], "eu-west-1");
    }

    #[test]
    fn test_malformed_env_values() {
        let result = ConfigLoader::new().apply_env(vars(&[("CLIENTREST__SERVER__PORT", "http")]));
        assert!(matches!(result, Err(ConfigError::EnvParseError { var, .. }) if var == "CLIENTREST__SERVER__PORT"));

        let result = ConfigLoader::new().apply_env(vars(&[("LOG_FORMAT", "xml")]));
        assert!(result.is_err());

        let result = ConfigLoader::new().apply_env(vars(&[("LOG_FIELDS", "[env]")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new()
            .apply_env(vars(&[("CLIENTREST__SERVER__PORT", "0")]))
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_dotenv_file() {
        let file = temp_file(".env", "CLIENTREST_CONFIG_TEST_DOTENV=loaded\n");
        ConfigLoader::new().with_dotenv_file(file.path()).unwrap();
        assert_eq!(
            env::var("CLIENTREST_CONFIG_TEST_DOTENV").as_deref(),
            Ok("loaded")
        );
    }
}
