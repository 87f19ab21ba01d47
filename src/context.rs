//! Caller context propagated with every RPC.
//!
//! The context carries identity, tenant and tracing data populated by the
//! caller's auth layer. This crate never looks inside it: it is bound to the
//! current task with [`scope`] (or [`sync_scope`]) and read back by the
//! dispatcher with [`current`] right before a call reaches the driver.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

tokio::task_local! {
    static CURRENT: CallContext;
}

/// Opaque caller context forwarded unchanged to the transport driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallContext(Map<String, Value>);

impl CallContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the context.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Borrow the raw fields.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the context, returning the raw fields.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for CallContext {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Run `fut` with `ctx` bound as the ambient call context.
pub async fn scope<F>(ctx: CallContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(ctx, fut).await
}

/// Run `f` synchronously with `ctx` bound as the ambient call context.
pub fn sync_scope<F, R>(ctx: CallContext, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT.sync_scope(ctx, f)
}

/// The context bound to the current task, if any.
pub fn current() -> Option<CallContext> {
    CURRENT.try_with(CallContext::clone).ok()
}
