//! Transport drivers for outbound RPC.
//!
//! This module contains:
//! - `RpcDriver` trait: the two transport primitives (blocking and fire-and-forget)
//! - Routing and call types shared by every driver
//! - `DriverRegistry`: named constructors selected by configuration
//! - Implementations: in-process channel, AMQP (RabbitMQ), Mock

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::TransportConfig;
use crate::context::CallContext;
use crate::error::RegistryError;

// Implementation modules
#[cfg(feature = "amqp")]
pub mod amqp;
pub mod channel;
pub mod mock;

// Re-exports
#[cfg(feature = "amqp")]
pub use amqp::AmqpDriver;
pub use channel::{ChannelDriver, ChannelHub, RemoteFailure, RpcHandler};
pub use mock::{MockDriver, RecordedCall};

/// Driver name for the in-process channel transport.
pub const CHANNEL_DRIVER: &str = "channel";
/// Driver name for the RabbitMQ transport.
pub const AMQP_DRIVER: &str = "amqp";

// ============================================================================
// Call types
// ============================================================================

/// Keyword arguments of a call, keyed by parameter name.
pub type CallArgs = Map<String, Value>;

/// Call discipline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    /// Block until the remote reply (or a failure) is available.
    #[default]
    Sync,
    /// Submit the call and return; the reply is never delivered.
    Async,
}

impl CallMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallMode::Sync => "sync",
            CallMode::Async => "async",
        }
    }
}

impl fmt::Display for CallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical destination of a call.
///
/// `topic` names the service queue (e.g. the executor pool), `server`
/// narrows delivery to one listener on that topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub topic: String,
    pub server: Option<String>,
    pub version: Option<String>,
}

impl Target {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            server: None,
            version: None,
        }
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Same target routed to a different topic.
    ///
    /// The server pin is dropped since it belongs to the original topic.
    pub fn with_topic(&self, topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            server: None,
            version: self.version.clone(),
        }
    }

    /// Routing key used by queue-based drivers: `topic` or `topic.server`.
    pub fn routing_key(&self) -> String {
        match &self.server {
            Some(server) => format!("{}.{}", self.topic, server),
            None => self.topic.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.routing_key())
    }
}

// ============================================================================
// Trait
// ============================================================================

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors raised by transport drivers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("no reply within {0}s")]
    Timeout(u64),

    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Application error raised by the remote service and carried back in the reply.
    #[error("remote error {exc_type}: {message}")]
    Remote { exc_type: String, message: String },
}

/// Pluggable RPC transport.
///
/// Implementations:
/// - `ChannelDriver`: in-process tokio channels
/// - `AmqpDriver`: RabbitMQ via AMQP
/// - `MockDriver`: records calls for testing
#[async_trait]
pub trait RpcDriver: Send + Sync {
    /// Deliver the call and wait for the remote reply.
    async fn sync_call(
        &self,
        ctx: &CallContext,
        target: &Target,
        method: &str,
        args: CallArgs,
    ) -> Result<Value>;

    /// Submit the call and return without waiting for the remote side.
    ///
    /// Only submission failures are reported.
    async fn async_call(
        &self,
        ctx: &CallContext,
        target: &Target,
        method: &str,
        args: CallArgs,
    ) -> Result<()>;

    /// Driver name, for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Factory
// ============================================================================

/// Constructor building a driver from transport settings.
pub type DriverConstructor =
    Arc<dyn Fn(&TransportConfig) -> Result<Arc<dyn RpcDriver>> + Send + Sync>;

/// Named driver constructors.
///
/// The driver used by a facade is picked by `TransportConfig::driver`.
#[derive(Clone)]
pub struct DriverRegistry {
    constructors: HashMap<String, DriverConstructor>,
}

impl DriverRegistry {
    /// Registry with no drivers.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry with the built-in drivers.
    ///
    /// - `channel`: always available, uses the process-wide `ChannelHub`
    /// - `amqp`: requires `--features amqp`
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();

        registry.register(CHANNEL_DRIVER, |config: &TransportConfig| {
            let driver = ChannelDriver::new(ChannelHub::global(), config.channel.clone());
            Ok(Arc::new(driver) as Arc<dyn RpcDriver>)
        });

        #[cfg(feature = "amqp")]
        registry.register(AMQP_DRIVER, |config: &TransportConfig| {
            let driver = AmqpDriver::new(config.amqp.clone())?;
            Ok(Arc::new(driver) as Arc<dyn RpcDriver>)
        });

        registry
    }

    /// Register (or replace) a named constructor.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&TransportConfig) -> Result<Arc<dyn RpcDriver>> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
    }

    /// Returns true if a constructor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered driver names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the driver selected by `config`.
    pub fn build(
        &self,
        config: &TransportConfig,
    ) -> std::result::Result<Arc<dyn RpcDriver>, RegistryError> {
        let constructor = self
            .constructors
            .get(&config.driver)
            .ok_or_else(|| RegistryError::UnknownDriver(config.driver.clone()))?;

        let driver = constructor(config).map_err(|source| RegistryError::Driver {
            driver: config.driver.clone(),
            source,
        })?;

        debug!(driver = %config.driver, "RPC driver constructed");
        Ok(driver)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}
