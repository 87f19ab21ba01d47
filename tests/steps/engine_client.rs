//! Engine client step definitions.

use std::sync::Arc;

use cucumber::{given, then, when, World};
use serde_json::{json, Map, Value};
use workflow_rpc::config::DEFAULT_ENGINE_TOPIC;
use workflow_rpc::driver::{MockDriver, RecordedCall};
use workflow_rpc::{
    CallContext, CallMode, Engine, EngineClient, FailureKind, MessagingError, Target,
    TerminalState,
};

use super::{driver_failure, json_arg, within};

/// Test context for Engine client scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct EngineWorld {
    driver: Arc<MockDriver>,
    client: EngineClient,
    context: Option<CallContext>,
    outcome: Option<Result<Option<Value>, MessagingError>>,
}

impl EngineWorld {
    fn new() -> Self {
        let driver = Arc::new(MockDriver::new());
        let client = EngineClient::with_driver(
            driver.clone(),
            Target::new(DEFAULT_ENGINE_TOPIC).with_version("1.0"),
        );
        Self {
            driver,
            client,
            context: None,
            outcome: None,
        }
    }

    async fn last_call(&self) -> RecordedCall {
        self.driver
            .last_call()
            .await
            .expect("driver received no call")
    }

    fn error(&self) -> &MessagingError {
        match &self.outcome {
            Some(Err(err)) => err,
            other => panic!("expected a failed call, got {:?}", other),
        }
    }
}

fn terminal_state(raw: &str) -> TerminalState {
    match raw {
        "SUCCESS" => TerminalState::Success,
        "ERROR" => TerminalState::Error,
        other => panic!("not a terminal state: {}", other),
    }
}

fn call_mode(raw: &str) -> CallMode {
    match raw {
        "sync" => CallMode::Sync,
        "async" => CallMode::Async,
        other => panic!("not a call mode: {}", other),
    }
}

// --- Given steps ---

#[given(expr = "a call context for user {string}")]
async fn given_call_context(world: &mut EngineWorld, user: String) {
    world.context = Some(
        CallContext::new()
            .with("user_id", user)
            .with("project_id", "p-1"),
    );
}

#[given("no call context is bound")]
async fn given_no_call_context(world: &mut EngineWorld) {
    world.context = None;
}

#[given(expr = "the engine replies with execution {string} in state {string}")]
async fn given_engine_reply(world: &mut EngineWorld, id: String, state: String) {
    world
        .driver
        .set_reply(json!({"id": id, "state": state}))
        .await;
}

#[given(expr = "the driver fails with {word} {string}")]
async fn given_driver_fails(world: &mut EngineWorld, kind: String, detail: String) {
    world
        .driver
        .set_failure(Some(driver_failure(&kind, &detail)))
        .await;
}

// --- When steps ---

#[when(expr = "I start workflow {string} in namespace {string} without input")]
async fn when_start_workflow(world: &mut EngineWorld, identifier: String, namespace: String) {
    let fut = world
        .client
        .start_workflow(&identifier, &namespace, None, "nightly run", Map::new());
    world.outcome = Some(within(world.context.clone(), fut).await.map(Some));
}

#[when(expr = "I pause workflow {string}")]
async fn when_pause_workflow(world: &mut EngineWorld, id: String) {
    let fut = world.client.pause_workflow(&id);
    world.outcome = Some(within(world.context.clone(), fut).await.map(Some));
}

#[when(expr = "I stop workflow {string} with state {string} and message {string}")]
async fn when_stop_workflow(world: &mut EngineWorld, id: String, state: String, message: String) {
    let fut = world
        .client
        .stop_workflow(&id, terminal_state(&state), Some(message.as_str()));
    world.outcome = Some(within(world.context.clone(), fut).await.map(Some));
}

#[when(expr = "I report completion of action {string} with result {string} as {word}")]
async fn when_on_action_complete(
    world: &mut EngineWorld,
    action_ex_id: String,
    result: String,
    mode: String,
) {
    let fut = world.client.on_action_complete(
        &action_ex_id,
        json_arg(&result),
        false,
        call_mode(&mode),
    );
    world.outcome = Some(within(world.context.clone(), fut).await);
}

// --- Then steps ---

#[then(expr = "the driver received one {word} call to {string} on topic {string}")]
async fn then_driver_received(world: &mut EngineWorld, mode: String, method: String, topic: String) {
    let call = world.last_call().await;
    assert_eq!(call.mode, call_mode(&mode));
    assert_eq!(call.method, method);
    assert_eq!(call.target.topic, topic);
}

#[then("the driver received no calls")]
async fn then_driver_received_nothing(world: &mut EngineWorld) {
    assert_eq!(world.driver.call_count().await, 0);
}

#[then(expr = "the call argument {string} is {string}")]
async fn then_call_argument(world: &mut EngineWorld, name: String, expected: String) {
    let call = world.last_call().await;
    assert_eq!(call.args.get(&name), Some(&json_arg(&expected)));
}

#[then(expr = "the call argument {string} is an empty mapping")]
async fn then_call_argument_empty(world: &mut EngineWorld, name: String) {
    let call = world.last_call().await;
    assert_eq!(call.args.get(&name), Some(&json!({})));
}

#[then(expr = "the call carried the context of user {string}")]
async fn then_call_context(world: &mut EngineWorld, user: String) {
    let call = world.last_call().await;
    assert_eq!(call.context.as_map().get("user_id"), Some(&json!(user)));
}

#[then(expr = "the result is execution {string}")]
async fn then_result_is_execution(world: &mut EngineWorld, id: String) {
    match &world.outcome {
        Some(Ok(Some(execution))) => assert_eq!(execution["id"], json!(id)),
        other => panic!("expected an execution, got {:?}", other),
    }
}

#[then("there is no result")]
async fn then_no_result(world: &mut EngineWorld) {
    assert!(matches!(world.outcome, Some(Ok(None))));
}

#[then(expr = "the call fails as a(n) {word} failure")]
async fn then_call_fails(world: &mut EngineWorld, kind: String) {
    let expected = match kind.as_str() {
        "local" => FailureKind::Local,
        "transport" => FailureKind::Transport,
        "application" => FailureKind::Application,
        other => panic!("not a failure kind: {}", other),
    };
    assert_eq!(world.error().kind(), expected);
}

#[then(expr = "the error message is {string}")]
async fn then_error_message(world: &mut EngineWorld, message: String) {
    assert_eq!(world.error().message(), message);
}

#[then(expr = "the error names method {string}")]
async fn then_error_method(world: &mut EngineWorld, method: String) {
    assert_eq!(world.error().method(), method);
}
