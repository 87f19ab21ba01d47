//! Call dispatcher shared by the service facades.
//!
//! Every outbound call goes through [`CallDispatcher::call`]: the ambient
//! context is attached, the SYNC or ASYNC driver primitive is chosen, and
//! driver failures are translated into [`MessagingError`]. No retries are
//! performed here.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::context::{self, CallContext};
use crate::driver::{CallArgs, CallMode, RpcDriver, Target};
use crate::error::{MessagingError, Result};

/// One RPC: a method name and its keyword arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    pub method: String,
    pub args: CallArgs,
}

impl CallDescriptor {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: CallArgs::new(),
        }
    }

    /// Add a keyword argument. `None` values are forwarded as null.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }
}

/// Binds a driver to one remote service.
#[derive(Clone)]
pub struct CallDispatcher {
    driver: Arc<dyn RpcDriver>,
    target: Target,
}

impl CallDispatcher {
    pub fn new(driver: Arc<dyn RpcDriver>, target: Target) -> Self {
        Self { driver, target }
    }

    /// Default routing target of the service.
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn driver(&self) -> &Arc<dyn RpcDriver> {
        &self.driver
    }

    /// Blocking call to the default target.
    pub async fn sync_call(&self, call: CallDescriptor) -> Result<Value> {
        let reply = self.call_with_context(CallMode::Sync, &self.target, call).await?;
        Ok(reply.unwrap_or(Value::Null))
    }

    /// Fire-and-forget call to the default target.
    pub async fn async_call(&self, call: CallDescriptor) -> Result<()> {
        self.call_with_context(CallMode::Async, &self.target, call)
            .await
            .map(|_| ())
    }

    /// Call with an explicit mode and target.
    ///
    /// Returns `Some(reply)` for SYNC calls and `None` for ASYNC calls.
    pub async fn call(
        &self,
        mode: CallMode,
        target: &Target,
        call: CallDescriptor,
    ) -> Result<Option<Value>> {
        self.call_with_context(mode, target, call).await
    }

    async fn call_with_context(
        &self,
        mode: CallMode,
        target: &Target,
        call: CallDescriptor,
    ) -> Result<Option<Value>> {
        let ctx = context::current().ok_or_else(|| MessagingError::MissingContext {
            method: call.method.clone(),
        })?;
        self.invoke(&ctx, mode, target, call).await
    }

    #[tracing::instrument(
        name = "rpc.call",
        skip_all,
        fields(method = %call.method, topic = %target, mode = %mode, driver = %self.driver.name())
    )]
    async fn invoke(
        &self,
        ctx: &CallContext,
        mode: CallMode,
        target: &Target,
        call: CallDescriptor,
    ) -> Result<Option<Value>> {
        let CallDescriptor { method, args } = call;

        debug!("Dispatching RPC");

        let outcome = match mode {
            CallMode::Sync => self
                .driver
                .sync_call(ctx, target, &method, args)
                .await
                .map(Some),
            CallMode::Async => self
                .driver
                .async_call(ctx, target, &method, args)
                .await
                .map(|_| None),
        };

        outcome.map_err(|err| {
            let err = MessagingError::from_driver(&method, err);
            warn!(kind = ?err.kind(), error = %err, "RPC failed");
            err
        })
    }
}

impl std::fmt::Debug for CallDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallDispatcher")
            .field("driver", &self.driver.name())
            .field("target", &self.target)
            .finish()
    }
}
