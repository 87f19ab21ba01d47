//! Workflow RPC - client facades for the workflow services.
//!
//! Lets a workflow front end reach the Engine, the Executor pool and the
//! Event Engine without knowing which transport driver carries the calls.
//! Every facade operation funnels through a [`dispatcher::CallDispatcher`],
//! which attaches the ambient [`context::CallContext`], picks the SYNC or
//! ASYNC driver primitive and translates driver failures into
//! [`error::MessagingError`].

pub mod client_traits;
pub mod clients;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod registry;

pub use client_traits::{Engine, EventEngine, Execution, Executor, RunAction, TerminalState};
pub use clients::{EngineClient, EventEngineClient, ExecutorClient};
pub use context::CallContext;
pub use dispatcher::{CallDescriptor, CallDispatcher};
pub use driver::{CallArgs, CallMode, DriverError, RpcDriver, Target};
pub use error::{FailureKind, MessagingError, RegistryError};
pub use registry::{
    get_engine_client, get_event_engine_client, get_executor_client, reset, ClientRegistry,
};
