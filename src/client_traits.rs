//! Service contracts for the Engine, Executor and Event Engine.
//!
//! These traits define the operations each remote service offers. The RPC
//! facades in [`crate::clients`] implement them; callers that depend on the
//! traits can swap in an in-process implementation or a test double.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::driver::CallMode;
use crate::error::Result;

/// Remote-side state of a workflow or action execution, returned verbatim.
pub type Execution = Value;

/// State a workflow can be stopped in. A stopped workflow cannot resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalState {
    Success,
    Error,
}

impl TerminalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalState::Success => "SUCCESS",
            TerminalState::Error => "ERROR",
        }
    }
}

impl From<TerminalState> for Value {
    fn from(state: TerminalState) -> Self {
        Value::String(state.as_str().to_string())
    }
}

/// Request to run an action on the executor pool.
///
/// Defaults: not redelivered, default executor topic, ASYNC.
#[derive(Debug, Clone, PartialEq)]
pub struct RunAction {
    pub action_ex_id: String,
    pub action_cls_str: String,
    pub action_cls_attrs: Map<String, Value>,
    pub params: Map<String, Value>,
    /// The executor may re-run the action if it dies mid-run.
    pub safe_rerun: bool,
    /// The action already ran on another executor.
    pub redelivered: bool,
    /// Executor group (topic) overriding the configured one.
    pub target: Option<String>,
    pub mode: CallMode,
}

impl RunAction {
    pub fn new(
        action_ex_id: impl Into<String>,
        action_cls_str: impl Into<String>,
        action_cls_attrs: Map<String, Value>,
        params: Map<String, Value>,
        safe_rerun: bool,
    ) -> Self {
        Self {
            action_ex_id: action_ex_id.into(),
            action_cls_str: action_cls_str.into(),
            action_cls_attrs,
            params,
            safe_rerun,
            redelivered: false,
            target: None,
            mode: CallMode::Async,
        }
    }

    pub fn redelivered(mut self, redelivered: bool) -> Self {
        self.redelivered = redelivered;
        self
    }

    /// Route to a specific executor group.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn mode(mut self, mode: CallMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Workflow Engine operations.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Start a workflow. A missing input is sent as an empty mapping.
    async fn start_workflow(
        &self,
        wf_identifier: &str,
        wf_namespace: &str,
        wf_input: Option<Map<String, Value>>,
        description: &str,
        params: Map<String, Value>,
    ) -> Result<Execution>;

    /// Start a standalone action outside of any workflow.
    async fn start_action(
        &self,
        action_name: &str,
        action_input: Option<Map<String, Value>>,
        description: Option<&str>,
        params: Map<String, Value>,
    ) -> Result<Execution>;

    /// Report an action result to the engine.
    ///
    /// May unblock downstream tasks. With `wf_action` the id names a nested
    /// workflow execution reporting to its parent. Returns `None` in ASYNC mode.
    async fn on_action_complete(
        &self,
        action_ex_id: &str,
        result: Value,
        wf_action: bool,
        mode: CallMode,
    ) -> Result<Option<Execution>>;

    async fn pause_workflow(&self, wf_ex_id: &str) -> Result<Execution>;

    /// Rerun a workflow from a task. `reset` purges the task's previous
    /// action executions first.
    async fn rerun_workflow(
        &self,
        task_ex_id: &str,
        reset: bool,
        env: Option<Map<String, Value>>,
    ) -> Result<Execution>;

    async fn resume_workflow(
        &self,
        wf_ex_id: &str,
        env: Option<Map<String, Value>>,
    ) -> Result<Execution>;

    async fn stop_workflow(
        &self,
        wf_ex_id: &str,
        state: TerminalState,
        message: Option<&str>,
    ) -> Result<Execution>;

    async fn rollback_workflow(&self, wf_ex_id: &str) -> Result<Execution>;
}

/// Executor pool operations.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run an action. Returns the action result in SYNC mode, `None` in ASYNC mode.
    async fn run_action(&self, request: RunAction) -> Result<Option<Value>>;
}

/// Event Engine operations. Triggers and events are forwarded verbatim.
#[async_trait]
pub trait EventEngine: Send + Sync {
    async fn create_event_trigger(&self, trigger: Value, events: Value) -> Result<Value>;

    async fn delete_event_trigger(&self, trigger: Value, events: Value) -> Result<Value>;

    async fn update_event_trigger(&self, trigger: Value) -> Result<Value>;
}
