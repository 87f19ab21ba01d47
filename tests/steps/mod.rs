//! Step definitions for facade feature tests.

pub mod engine_client;
pub mod executor_client;

use std::future::Future;

use serde_json::Value;
use workflow_rpc::context::{self, CallContext};
use workflow_rpc::driver::DriverError;

/// Run `fut` inside `ctx` when one is set, otherwise with no ambient context.
pub async fn within<F: Future>(ctx: Option<CallContext>, fut: F) -> F::Output {
    match ctx {
        Some(ctx) => context::scope(ctx, fut).await,
        None => fut.await,
    }
}

/// Parse a step argument as JSON, falling back to a plain string.
pub fn json_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Driver failure named in a scenario.
pub fn driver_failure(kind: &str, detail: &str) -> DriverError {
    match kind {
        "connection" => DriverError::Connection(detail.to_string()),
        "delivery" => DriverError::Delivery(detail.to_string()),
        "timeout" => DriverError::Timeout(detail.parse().unwrap_or(60)),
        other => DriverError::Remote {
            exc_type: other.to_string(),
            message: detail.to_string(),
        },
    }
}
