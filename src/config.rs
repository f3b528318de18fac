//! Layered runtime configuration.
//!
//! Values are resolved in order, later layers winning: built-in defaults, an
//! optional TOML file, `SCORING__SECTION__KEY` environment variables, then
//! command-line flags (applied by the binary).

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "SCORING";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse environment variable {var}: {reason}")]
    Env { var: String, reason: &'static str },

    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// IP literal to bind.
    pub host: String,
    pub port: u16,
    /// Upper bound for reading a body and producing its response.
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            request_timeout_ms: 30_000,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "server.host",
                reason: err.to_string(),
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub salt: String,
    pub admin_salt: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            salt: "Otus".to_owned(),
            admin_salt: "42".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Redis server, e.g. `redis://127.0.0.1:6379/0`. Unset keeps the cache
    /// in process memory.
    pub url: Option<String>,
    /// Connect, read and write timeout of the Redis backend.
    pub timeout_ms: u64,
    /// Attempts per cache operation, including the first.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 2_000,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl StoreConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `scoring_api=debug`.
    pub level: String,
    pub json: bool,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
            file: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port",
                reason: "must be non-zero".to_owned(),
            });
        }
        self.server.socket_addr()?;
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.request_timeout_ms",
                reason: "must be non-zero".to_owned(),
            });
        }
        if self.store.url.is_some() && self.store.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store.timeout_ms",
                reason: "must be non-zero".to_owned(),
            });
        }
        if self.auth.salt.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "auth.salt",
                reason: "must not be empty".to_owned(),
            });
        }
        if self.auth.admin_salt.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "auth.admin_salt",
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
/// Builder applying configuration layers in call order.
///
/// ```no_run
/// use scoring_api::config::ConfigLoader;
///
/// # fn main() -> Result<(), scoring_api::config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("scoring.toml")?
///     .with_process_env()?
///     .load()?;
/// # Ok(())
/// # }
/// ```
pub struct ConfigLoader {
    config: Config,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current values with a TOML file; sections and keys it
    /// omits fall back to defaults.
    pub fn with_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.with_toml(&content)
    }

    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    pub fn with_toml(mut self, content: &str) -> Result<Self, ConfigError> {
        self.config = toml::from_str(content)?;
        Ok(self)
    }

    /// Apply `SCORING__*` variables of the running process.
    pub fn with_process_env(self) -> Result<Self, ConfigError> {
        self.with_env(env::vars())
    }

    /// Apply overrides from `(name, value)` pairs; names without the
    /// `SCORING__` prefix are skipped, unknown keys under it are rejected.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            let Some(rest) = key
                .strip_prefix(ENV_PREFIX)
                .and_then(|rest| rest.strip_prefix("__"))
            else {
                continue;
            };
            self.apply_env_var(key, rest, value.as_ref())?;
        }
        Ok(self)
    }

    fn apply_env_var(&mut self, var: &str, key: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = key.split("__").collect();
        let config = &mut self.config;
        match parts.as_slice() {
            ["SERVER", "HOST"] => config.server.host = value.to_owned(),
            ["SERVER", "PORT"] => config.server.port = parse(var, value, "expected a port")?,
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                config.server.request_timeout_ms = parse(var, value, "expected integer")?;
            }
            ["AUTH", "SALT"] => config.auth.salt = value.to_owned(),
            ["AUTH", "ADMIN_SALT"] => config.auth.admin_salt = value.to_owned(),
            ["STORE", "URL"] => {
                config.store.url = (!value.is_empty()).then(|| value.to_owned());
            }
            ["STORE", "TIMEOUT_MS"] => {
                config.store.timeout_ms = parse(var, value, "expected integer")?;
            }
            ["STORE", "MAX_RETRIES"] => {
                config.store.max_retries = parse(var, value, "expected integer")?;
            }
            ["STORE", "RETRY_DELAY_MS"] => {
                config.store.retry_delay_ms = parse(var, value, "expected integer")?;
            }
            ["LOG", "LEVEL"] => config.log.level = value.to_owned(),
            ["LOG", "JSON"] => {
                config.log.json = parse_bool(value).ok_or_else(|| ConfigError::Env {
                    var: var.to_owned(),
                    reason: "expected boolean",
                })?;
            }
            ["LOG", "FILE"] => {
                config.log.file = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            _ => {
                return Err(ConfigError::Env {
                    var: var.to_owned(),
                    reason: "unknown configuration key",
                });
            }
        }
        Ok(())
    }

    /// Validate and return the merged configuration.
    pub fn load(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Merged configuration without validation, for callers that still
    /// layer values on top.
    pub fn load_unvalidated(self) -> Config {
        self.config
    }
}

fn parse<T: std::str::FromStr>(
    var: &str,
    value: &str,
    reason: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_owned(),
        reason,
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
