//! Command-line entry point of the `scoring-api` binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::config::{Config, ConfigError, ConfigLoader, StoreConfig};
use crate::domain::Authenticator;
use crate::service::Api;
use crate::store::{MemoryStore, RedisStore, RetryingStore, Store, StoreError};
use crate::telemetry::{self, TelemetryError};
use crate::transport::{Server, ServerError};

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "scoring-api",
    about = "Serve the scoring JSON API over HTTP",
    version
)]
pub struct Cli {
    /// Port to listen on.
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Append logs to this file instead of stderr.
    #[arg(short, long, value_name = "path")]
    pub log: Option<PathBuf>,
    /// TOML configuration file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,
    /// IP address to bind.
    #[arg(long)]
    pub host: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to set up the cache: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

impl Cli {
    /// Resolve the full configuration with these flags as the top layer.
    pub fn load_config(&self) -> Result<Config, CliError> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &self.config {
            loader = loader.with_file(path)?;
        }
        let mut config = loader.with_process_env()?.load_unvalidated();
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(log) = &self.log {
            config.log.file = Some(log.clone());
        }
    }
}

/// Load configuration, install logging, then serve until Ctrl-C.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.load_config()?;
    telemetry::init_logging(&config.log)?;

    let store = build_store(&config.store)?;
    let auth = Authenticator::new(config.auth.salt.clone(), config.auth.admin_salt.clone());
    let api = Api::new(auth, store);

    let server = Server::bind(
        config.server.socket_addr()?,
        api,
        config.server.request_timeout(),
    )
    .await?;
    server.run().await?;
    tracing::info!("server stopped");
    Ok(())
}

/// Redis when `store.url` is set, process memory otherwise; either way
/// behind the retry policy.
pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn Store>, CliError> {
    let (max_retries, delay) = (config.max_retries, config.retry_delay());
    let store: Arc<dyn Store> = match &config.url {
        Some(url) => {
            tracing::info!("using redis cache");
            let redis = RedisStore::open(url, config.timeout())?;
            Arc::new(RetryingStore::new(redis, max_retries, delay))
        }
        None => {
            tracing::info!("using in-memory cache");
            Arc::new(RetryingStore::new(MemoryStore::new(), max_retries, delay))
        }
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_in_short_and_long_form() {
        let cli = Cli::try_parse_from(["scoring-api", "-p", "9000", "--log", "/tmp/api.log"])
            .unwrap();
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.log, Some(PathBuf::from("/tmp/api.log")));
        assert!(Cli::try_parse_from(["scoring-api", "--port", "http"]).is_err());
    }

    #[test]
    fn flags_override_loaded_values() {
        let cli = Cli {
            port: Some(9999),
            host: Some("0.0.0.0".to_owned()),
            ..Cli::default()
        };
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.log.file, None);
    }

    #[test]
    fn store_backend_follows_the_url() {
        let memory = build_store(&StoreConfig::default()).unwrap();
        assert!(memory.available());

        let config = StoreConfig {
            url: Some("redis://127.0.0.1:1/0".to_owned()),
            timeout_ms: 200,
            max_retries: 1,
            ..StoreConfig::default()
        };
        let redis = build_store(&config).unwrap();
        assert!(!redis.available());

        let config = StoreConfig {
            url: Some("not a url".to_owned()),
            ..StoreConfig::default()
        };
        assert!(matches!(build_store(&config), Err(CliError::Store(_))));
    }

    #[test]
    fn zero_port_flag_is_rejected() {
        let cli = Cli {
            port: Some(0),
            ..Cli::default()
        };
        assert!(matches!(
            cli.load_config(),
            Err(CliError::Config(ConfigError::InvalidValue { field: "server.port", .. }))
        ));
    }
}
