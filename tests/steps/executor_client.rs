//! Executor and Event Engine client step definitions.

use std::sync::Arc;

use cucumber::{given, then, when, World};
use serde_json::{Map, Value};
use workflow_rpc::config::{DEFAULT_EVENT_ENGINE_TOPIC, DEFAULT_EXECUTOR_TOPIC};
use workflow_rpc::driver::MockDriver;
use workflow_rpc::{
    CallContext, CallMode, EventEngine, EventEngineClient, Executor, ExecutorClient,
    MessagingError, RunAction, Target,
};

use super::{driver_failure, json_arg, within};

/// Test context for Executor and Event Engine scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct ExecutorWorld {
    driver: Arc<MockDriver>,
    executor: ExecutorClient,
    event_engine: EventEngineClient,
    request: Option<RunAction>,
    outcome: Option<Result<Option<Value>, MessagingError>>,
}

impl ExecutorWorld {
    fn new() -> Self {
        let driver = Arc::new(MockDriver::new());
        let executor = ExecutorClient::with_driver(
            driver.clone(),
            Target::new(DEFAULT_EXECUTOR_TOPIC).with_version("1.0"),
        );
        let event_engine =
            EventEngineClient::with_driver(driver.clone(), Target::new(DEFAULT_EVENT_ENGINE_TOPIC));
        Self {
            driver,
            executor,
            event_engine,
            request: None,
            outcome: None,
        }
    }

    fn request_mut(&mut self) -> &mut RunAction {
        self.request.as_mut().expect("no action request prepared")
    }
}

fn ctx() -> CallContext {
    CallContext::new()
        .with("user_id", "bob")
        .with("project_id", "p-2")
}

// --- Given steps ---

#[given(expr = "an action request {string} for {string} with params {string}")]
async fn given_action_request(world: &mut ExecutorWorld, id: String, action: String, params: String) {
    let params = match json_arg(&params) {
        Value::Object(map) => map,
        other => panic!("params must be a mapping, got {}", other),
    };
    world.request = Some(RunAction::new(id, action, Map::new(), params, false));
}

#[given(expr = "the request targets executor group {string}")]
async fn given_request_target(world: &mut ExecutorWorld, group: String) {
    let request = world.request_mut();
    request.target = Some(group);
}

#[given("the request waits for the result")]
async fn given_request_sync(world: &mut ExecutorWorld) {
    world.request_mut().mode = CallMode::Sync;
}

#[given("the request is a redelivery")]
async fn given_request_redelivered(world: &mut ExecutorWorld) {
    world.request_mut().redelivered = true;
}

#[given(expr = "the executor replies {string}")]
async fn given_executor_reply(world: &mut ExecutorWorld, reply: String) {
    world.driver.set_reply(json_arg(&reply)).await;
}

#[given(expr = "the driver fails with {word} {string}")]
async fn given_driver_fails(world: &mut ExecutorWorld, kind: String, detail: String) {
    world
        .driver
        .set_failure(Some(driver_failure(&kind, &detail)))
        .await;
}

// --- When steps ---

#[when("I run the action")]
async fn when_run_action(world: &mut ExecutorWorld) {
    let request = world.request.clone().expect("no action request prepared");
    let fut = world.executor.run_action(request);
    world.outcome = Some(within(Some(ctx()), fut).await);
}

#[when(expr = "I create an event trigger {string} for events {string}")]
async fn when_create_trigger(world: &mut ExecutorWorld, trigger: String, events: String) {
    let fut = world
        .event_engine
        .create_event_trigger(json_arg(&trigger), json_arg(&events));
    world.outcome = Some(within(Some(ctx()), fut).await.map(Some));
}

// --- Then steps ---

#[then(expr = "the driver received one {word} call to {string} on topic {string}")]
async fn then_driver_received(
    world: &mut ExecutorWorld,
    mode: String,
    method: String,
    topic: String,
) {
    let call = world.driver.last_call().await.expect("driver received no call");
    let expected = match mode.as_str() {
        "sync" => CallMode::Sync,
        "async" => CallMode::Async,
        other => panic!("not a call mode: {}", other),
    };
    assert_eq!(world.driver.call_count().await, 1);
    assert_eq!(call.mode, expected);
    assert_eq!(call.method, method);
    assert_eq!(call.target.topic, topic);
}

#[then(expr = "the call argument {string} is {string}")]
async fn then_call_argument(world: &mut ExecutorWorld, name: String, expected: String) {
    let call = world.driver.last_call().await.expect("driver received no call");
    assert_eq!(call.args.get(&name), Some(&json_arg(&expected)));
}

#[then(expr = "the call was pinned to version {string}")]
async fn then_call_version(world: &mut ExecutorWorld, version: String) {
    let call = world.driver.last_call().await.expect("driver received no call");
    assert_eq!(call.target.version, Some(version));
}

#[then(expr = "the result is {string}")]
async fn then_result(world: &mut ExecutorWorld, expected: String) {
    match &world.outcome {
        Some(Ok(Some(value))) => assert_eq!(value, &json_arg(&expected)),
        other => panic!("expected a result, got {:?}", other),
    }
}

#[then("there is no result")]
async fn then_no_result(world: &mut ExecutorWorld) {
    assert!(matches!(world.outcome, Some(Ok(None))));
}

#[then(expr = "the call fails naming method {string}")]
async fn then_call_fails(world: &mut ExecutorWorld, method: String) {
    match &world.outcome {
        Some(Err(err)) => {
            assert!(err.is_transport());
            assert_eq!(err.method(), method);
        }
        other => panic!("expected a failed call, got {:?}", other),
    }
    assert_eq!(world.driver.call_count().await, 0);
}
