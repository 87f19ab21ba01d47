//! Transport driver configuration types.

use serde::Deserialize;

use crate::driver::CHANNEL_DRIVER;

/// Default seconds a sync call waits for its reply.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 60;

/// Transport configuration (discriminated union).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Driver name, looked up in the `DriverRegistry`.
    #[serde(rename = "type")]
    pub driver: String,
    /// Channel-specific configuration.
    pub channel: ChannelConfig,
    /// AMQP-specific configuration.
    pub amqp: AmqpConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            driver: CHANNEL_DRIVER.to_string(),
            channel: ChannelConfig::default(),
            amqp: AmqpConfig::default(),
        }
    }
}

/// In-process channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Seconds a sync call waits for the listener's reply.
    pub rpc_timeout_secs: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
        }
    }
}

/// AMQP-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AmqpConfig {
    /// AMQP connection URL.
    pub url: String,
    /// Topic exchange calls are published to.
    pub exchange: String,
    /// Seconds a sync call waits for its reply.
    pub rpc_timeout_secs: u64,
    /// Maximum pooled connections.
    pub pool_size: usize,
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            url: "amqp://localhost:5672".to_string(),
            exchange: "workflow.rpc".to_string(),
            rpc_timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
            pool_size: 10,
        }
    }
}
