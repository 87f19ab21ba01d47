//! Mock driver implementation for testing.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{CallArgs, CallMode, DriverError, Result, RpcDriver, Target};
use crate::context::CallContext;

/// A call observed by the mock driver.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub mode: CallMode,
    pub context: CallContext,
    pub target: Target,
    pub method: String,
    pub args: CallArgs,
}

/// Mock driver for testing.
///
/// Records every call; sync calls answer with the configured reply.
#[derive(Debug, Default)]
pub struct MockDriver {
    calls: RwLock<Vec<RecordedCall>>,
    reply: RwLock<Value>,
    failure: RwLock<Option<DriverError>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply returned by subsequent sync calls.
    pub async fn set_reply(&self, reply: Value) {
        *self.reply.write().await = reply;
    }

    /// Make subsequent calls (sync and async) fail with `error`.
    pub async fn set_failure(&self, error: Option<DriverError>) {
        *self.failure.write().await = error;
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    pub async fn last_call(&self) -> Option<RecordedCall> {
        self.calls.read().await.last().cloned()
    }

    pub async fn take_calls(&self) -> Vec<RecordedCall> {
        std::mem::take(&mut *self.calls.write().await)
    }

    async fn record(
        &self,
        mode: CallMode,
        ctx: &CallContext,
        target: &Target,
        method: &str,
        args: CallArgs,
    ) -> Result<()> {
        if let Some(err) = self.failure.read().await.clone() {
            return Err(err);
        }
        self.calls.write().await.push(RecordedCall {
            mode,
            context: ctx.clone(),
            target: target.clone(),
            method: method.to_string(),
            args,
        });
        Ok(())
    }
}

#[async_trait]
impl RpcDriver for MockDriver {
    async fn sync_call(
        &self,
        ctx: &CallContext,
        target: &Target,
        method: &str,
        args: CallArgs,
    ) -> Result<Value> {
        self.record(CallMode::Sync, ctx, target, method, args).await?;
        Ok(self.reply.read().await.clone())
    }

    async fn async_call(
        &self,
        ctx: &CallContext,
        target: &Target,
        method: &str,
        args: CallArgs,
    ) -> Result<()> {
        self.record(CallMode::Async, ctx, target, method, args).await
    }

    fn name(&self) -> &str {
        "mock"
    }
}
