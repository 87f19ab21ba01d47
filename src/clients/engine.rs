//! RPC client for the workflow Engine.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::info;

use crate::client_traits::{Engine, Execution, TerminalState};
use crate::config::{RpcServiceConfig, DEFAULT_ENGINE_TOPIC};
use crate::dispatcher::{CallDescriptor, CallDispatcher};
use crate::driver::{CallMode, DriverRegistry, RpcDriver, Target};
use crate::error::{RegistryError, Result};

/// Engine facade.
///
/// Every operation is a SYNC call except `on_action_complete`, whose mode
/// is picked per call.
#[derive(Debug, Clone)]
pub struct EngineClient {
    dispatcher: CallDispatcher,
}

impl EngineClient {
    /// Build the client and its driver from the `engine` config section.
    pub fn new(
        config: &RpcServiceConfig,
        drivers: &DriverRegistry,
    ) -> std::result::Result<Self, RegistryError> {
        let driver = drivers.build(&config.transport)?;
        let target = config.target(DEFAULT_ENGINE_TOPIC);

        info!(
            driver = %driver.name(),
            target = %target,
            "Engine client constructed"
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
impl Engine for EngineClient {
    async fn start_workflow(
        &self,
        wf_identifier: &str,
        wf_namespace: &str,
        wf_input: Option<Map<String, Value>>,
        description: &str,
        params: Map<String, Value>,
    ) -> Result<Execution> {
        self.dispatcher
            .sync_call(
                CallDescriptor::new("start_workflow")
                    .arg("workflow_identifier", wf_identifier)
                    .arg("workflow_namespace", wf_namespace)
                    .arg("workflow_input", wf_input.unwrap_or_default())
                    .arg("description", description)
                    .arg("params", params),
            )
            .await
    }

    async fn start_action(
        &self,
        action_name: &str,
        action_input: Option<Map<String, Value>>,
        description: Option<&str>,
        params: Map<String, Value>,
    ) -> Result<Execution> {
        self.dispatcher
            .sync_call(
                CallDescriptor::new("start_action")
                    .arg("action_name", action_name)
                    .arg("action_input", action_input.unwrap_or_default())
                    .arg("description", description)
                    .arg("params", params),
            )
            .await
    }

    async fn on_action_complete(
        &self,
        action_ex_id: &str,
        result: Value,
        wf_action: bool,
        mode: CallMode,
    ) -> Result<Option<Execution>> {
        let call = CallDescriptor::new("on_action_complete")
            .arg("action_ex_id", action_ex_id)
            .arg("result", result)
            .arg("wf_action", wf_action);

        self.dispatcher
            .call(mode, self.dispatcher.target(), call)
            .await
    }

    async fn pause_workflow(&self, wf_ex_id: &str) -> Result<Execution> {
        self.dispatcher
            .sync_call(CallDescriptor::new("pause_workflow").arg("execution_id", wf_ex_id))
            .await
    }

    async fn rerun_workflow(
        &self,
        task_ex_id: &str,
        reset: bool,
        env: Option<Map<String, Value>>,
    ) -> Result<Execution> {
        self.dispatcher
            .sync_call(
                CallDescriptor::new("rerun_workflow")
                    .arg("task_ex_id", task_ex_id)
                    .arg("reset", reset)
                    .arg("env", env),
            )
            .await
    }

    async fn resume_workflow(
        &self,
        wf_ex_id: &str,
        env: Option<Map<String, Value>>,
    ) -> Result<Execution> {
        self.dispatcher
            .sync_call(
                CallDescriptor::new("resume_workflow")
                    .arg("wf_ex_id", wf_ex_id)
                    .arg("env", env),
            )
            .await
    }

    async fn stop_workflow(
        &self,
        wf_ex_id: &str,
        state: TerminalState,
        message: Option<&str>,
    ) -> Result<Execution> {
        self.dispatcher
            .sync_call(
                CallDescriptor::new("stop_workflow")
                    .arg("execution_id", wf_ex_id)
                    .arg("state", state)
                    .arg("message", message),
            )
            .await
    }

    async fn rollback_workflow(&self, wf_ex_id: &str) -> Result<Execution> {
        self.dispatcher
            .sync_call(CallDescriptor::new("rollback_workflow").arg("execution_id", wf_ex_id))
            .await
    }
}
