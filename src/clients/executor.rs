//! RPC client for the Executor pool.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::client_traits::{Executor, RunAction};
use crate::config::{RpcServiceConfig, DEFAULT_EXECUTOR_TOPIC};
use crate::dispatcher::{CallDescriptor, CallDispatcher};
use crate::driver::{DriverRegistry, RpcDriver, Target};
use crate::error::{RegistryError, Result};

/// Executor facade.
///
/// Actions are dispatched ASYNC unless the request asks otherwise, and can
/// be routed to a specific executor group instead of the configured topic.
#[derive(Debug, Clone)]
pub struct ExecutorClient {
    dispatcher: CallDispatcher,
}

impl ExecutorClient {
    /// Build the client and its driver from the `executor` config section.
    pub fn new(
        config: &RpcServiceConfig,
        drivers: &DriverRegistry,
    ) -> std::result::Result<Self, RegistryError> {
        let driver = drivers.build(&config.transport)?;
        let target = config.target(DEFAULT_EXECUTOR_TOPIC);

        info!(
            driver = %driver.name(),
            target = %target,
            "Executor client constructed"
        );

        Ok(Self::with_driver(driver, target))
    }

    /// Build the client around an existing driver.
    pub fn with_driver(driver: Arc<dyn RpcDriver>, target: Target) -> Self {
        Self {
            dispatcher: CallDispatcher::new(driver, target),
        }
    }

    /// Default executor target.
    pub fn target(&self) -> &Target {
        self.dispatcher.target()
    }

    fn resolve_target(&self, group: Option<&str>) -> Target {
        match group {
            Some(topic) => self.dispatcher.target().with_topic(topic),
            None => self.dispatcher.target().clone(),
        }
    }
}

#[async_trait]
impl Executor for ExecutorClient {
    async fn run_action(&self, request: RunAction) -> Result<Option<Value>> {
        let target = self.resolve_target(request.target.as_deref());

        debug!(
            action_ex_id = %request.action_ex_id,
            action = %request.action_cls_str,
            target = %target,
            mode = %request.mode,
            "Sending action to executor"
        );

        let call = CallDescriptor::new("run_action")
            .arg("action_ex_id", request.action_ex_id)
            .arg("action_cls_str", request.action_cls_str)
            .arg("action_cls_attrs", request.action_cls_attrs)
            .arg("params", request.params)
            .arg("safe_rerun", request.safe_rerun)
            .arg("redelivered", request.redelivered);

        self.dispatcher.call(request.mode, &target, call).await
    }
}
