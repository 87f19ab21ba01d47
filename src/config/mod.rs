//! Application configuration.
//!
//! Aggregates the per-service RPC sections into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod service;
mod transport;

pub use service::{
    RpcServiceConfig, DEFAULT_ENGINE_TOPIC, DEFAULT_EVENT_ENGINE_TOPIC, DEFAULT_EXECUTOR_TOPIC,
    DEFAULT_RPC_VERSION,
};
pub use transport::{AmqpConfig, ChannelConfig, TransportConfig, DEFAULT_RPC_TIMEOUT_SECS};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "WORKFLOW_RPC_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "WORKFLOW_RPC";

use serde::Deserialize;

/// RPC configuration of all remote services.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine service section.
    pub engine: RpcServiceConfig,
    /// Executor pool section.
    pub executor: RpcServiceConfig,
    /// Event Engine service section.
    pub event_engine: RpcServiceConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ::config::ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Config routing every service through the same driver.
    pub fn with_driver(driver: &str) -> Self {
        Self {
            engine: RpcServiceConfig::default().with_driver(driver),
            executor: RpcServiceConfig::default().with_driver(driver),
            event_engine: RpcServiceConfig::default().with_driver(driver),
        }
    }
}
