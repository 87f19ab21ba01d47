//! RPC client for the Event Engine.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::client_traits::EventEngine;
use crate::config::{RpcServiceConfig, DEFAULT_EVENT_ENGINE_TOPIC};
use crate::dispatcher::{CallDescriptor, CallDispatcher};
use crate::driver::{DriverRegistry, RpcDriver, Target};
use crate::error::{RegistryError, Result};

/// Event Engine facade. All operations are SYNC pass-throughs.
#[derive(Debug, Clone)]
pub struct EventEngineClient {
    dispatcher: CallDispatcher,
}

impl EventEngineClient {
    /// Build the client and its driver from the `event_engine` config section.
    pub fn new(
        config: &RpcServiceConfig,
        drivers: &DriverRegistry,
    ) -> std::result::Result<Self, RegistryError> {
        let driver = drivers.build(&config.transport)?;
        let target = config.target(DEFAULT_EVENT_ENGINE_TOPIC);

        info!(
            driver = %driver.name(),
            target = %target,
            "Event engine client constructed"
        );

        Ok(Self::with_driver(driver, target))
    }

    /// Build the client around an existing driver.
    pub fn with_driver(driver: Arc<dyn RpcDriver>, target: Target) -> Self {
        Self {
            dispatcher: CallDispatcher::new(driver, target),
        }
    }

    pub fn target(&self) -> &Target {
        self.dispatcher.target()
    }
}

#[async_trait]
impl EventEngine for EventEngineClient {
    async fn create_event_trigger(&self, trigger: Value, events: Value) -> Result<Value> {
        self.dispatcher
            .sync_call(
                CallDescriptor::new("create_event_trigger")
                    .arg("trigger", trigger)
                    .arg("events", events),
            )
            .await
    }

    async fn delete_event_trigger(&self, trigger: Value, events: Value) -> Result<Value> {
        self.dispatcher
            .sync_call(
                CallDescriptor::new("delete_event_trigger")
                    .arg("trigger", trigger)
                    .arg("events", events),
            )
            .await
    }

    async fn update_event_trigger(&self, trigger: Value) -> Result<Value> {
        self.dispatcher
            .sync_call(CallDescriptor::new("update_event_trigger").arg("trigger", trigger))
            .await
    }
}
