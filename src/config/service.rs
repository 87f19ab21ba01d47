//! Per-service RPC configuration.
//!
//! Each remote service (engine, executor, event engine) gets its own
//! section naming its routing target and the transport used to reach it.

use serde::Deserialize;

use super::TransportConfig;
use crate::driver::Target;

/// Default topic of the Engine service.
pub const DEFAULT_ENGINE_TOPIC: &str = "workflow_engine";
/// Default topic of the Executor pool.
pub const DEFAULT_EXECUTOR_TOPIC: &str = "workflow_executor";
/// Default topic of the Event Engine service.
pub const DEFAULT_EVENT_ENGINE_TOPIC: &str = "workflow_event_engine";
/// RPC API version announced with every target.
pub const DEFAULT_RPC_VERSION: &str = "1.0";

// ============================================================================
// Configuration
// ============================================================================

/// RPC configuration of one remote service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RpcServiceConfig {
    /// Topic the service listens on. None = the service's default topic.
    pub topic: Option<String>,
    /// Pin calls to one server on the topic.
    pub server: Option<String>,
    /// RPC API version.
    pub version: String,
    /// Transport used to reach the service.
    pub transport: TransportConfig,
}

impl Default for RpcServiceConfig {
    fn default() -> Self {
        Self {
            topic: None,
            server: None,
            version: DEFAULT_RPC_VERSION.to_string(),
            transport: TransportConfig::default(),
        }
    }
}

impl RpcServiceConfig {
    /// Config routed to `topic`.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Config using the named driver.
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.transport.driver = driver.into();
        self
    }

    /// Routing target, falling back to `default_topic` when no topic is set.
    pub fn target(&self, default_topic: &str) -> Target {
        let topic = self.topic.as_deref().unwrap_or(default_topic);
        let mut target = Target::new(topic).with_version(self.version.clone());
        if let Some(server) = &self.server {
            target = target.with_server(server.clone());
        }
        target
    }
}
