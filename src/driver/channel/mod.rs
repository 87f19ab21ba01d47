//! In-memory channel-based driver for standalone mode.
//!
//! Uses tokio mpsc channels to deliver calls to listeners registered on a
//! `ChannelHub` within a single process. Ideal for local development and
//! testing without a message broker.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{CallArgs, DriverError, Result, RpcDriver, Target, CHANNEL_DRIVER};
use crate::config::ChannelConfig;
use crate::context::CallContext;

/// Queue capacity per listener.
const CHANNEL_CAPACITY: usize = 1024;

static GLOBAL_HUB: LazyLock<Arc<ChannelHub>> =
    LazyLock::new(|| Arc::new(ChannelHub::new(CHANNEL_CAPACITY)));

/// Domain error raised by a listener while handling a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    pub exc_type: String,
    pub message: String,
}

impl RemoteFailure {
    pub fn new(exc_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            exc_type: exc_type.into(),
            message: message.into(),
        }
    }
}

impl From<RemoteFailure> for DriverError {
    fn from(failure: RemoteFailure) -> Self {
        DriverError::Remote {
            exc_type: failure.exc_type,
            message: failure.message,
        }
    }
}

/// Server side of the channel transport.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    /// Handle one call delivered to the listener.
    async fn handle(
        &self,
        ctx: CallContext,
        method: &str,
        args: CallArgs,
    ) -> std::result::Result<Value, RemoteFailure>;
}

type Reply = std::result::Result<Value, RemoteFailure>;

struct Envelope {
    context: CallContext,
    method: String,
    args: CallArgs,
    reply: Option<oneshot::Sender<Reply>>,
}

/// Routing table shared by listeners and drivers in one process.
///
/// Listeners are keyed by routing key (`topic` or `topic.server`). Each
/// listener handles its calls one at a time, in arrival order.
pub struct ChannelHub {
    listeners: RwLock<HashMap<String, mpsc::Sender<Envelope>>>,
    capacity: usize,
}

impl ChannelHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// The process-wide hub used by the `channel` driver constructor.
    pub fn global() -> Arc<ChannelHub> {
        GLOBAL_HUB.clone()
    }

    /// Start a listener for `routing_key`.
    ///
    /// Replaces any listener already registered under the same key; the
    /// replaced listener drains its queue and stops.
    pub async fn serve(
        &self,
        routing_key: impl Into<String>,
        handler: Arc<dyn RpcHandler>,
    ) -> JoinHandle<()> {
        let routing_key = routing_key.into();
        let (sender, mut receiver) = mpsc::channel::<Envelope>(self.capacity);

        self.listeners
            .write()
            .await
            .insert(routing_key.clone(), sender);

        info!(routing_key = %routing_key, "Channel listener started");

        tokio::spawn(async move {
            while let Some(envelope) = receiver.recv().await {
                debug!(
                    routing_key = %routing_key,
                    method = %envelope.method,
                    "Received call via channel"
                );

                let result = handler
                    .handle(envelope.context, &envelope.method, envelope.args)
                    .await;

                match envelope.reply {
                    Some(reply) => {
                        // Caller may have timed out and dropped the receiver.
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(failure) = result {
                            warn!(
                                routing_key = %routing_key,
                                method = %envelope.method,
                                exc_type = %failure.exc_type,
                                error = %failure.message,
                                "Async call failed on listener"
                            );
                        }
                    }
                }
            }
            info!(routing_key = %routing_key, "Channel listener stopped");
        })
    }

    /// Remove the listener for `routing_key`. Returns true if one was registered.
    pub async fn stop(&self, routing_key: &str) -> bool {
        self.listeners.write().await.remove(routing_key).is_some()
    }

    /// Returns true if a listener is registered for `routing_key`.
    pub async fn is_serving(&self, routing_key: &str) -> bool {
        self.listeners.read().await.contains_key(routing_key)
    }

    /// Sender for `target`: the exact routing key first, then the bare topic.
    async fn sender_for(&self, target: &Target) -> Result<mpsc::Sender<Envelope>> {
        let listeners = self.listeners.read().await;
        listeners
            .get(&target.routing_key())
            .or_else(|| listeners.get(&target.topic))
            .cloned()
            .ok_or_else(|| DriverError::Delivery(format!("no listener on '{}'", target)))
    }
}

/// Driver delivering calls through a `ChannelHub`.
pub struct ChannelDriver {
    hub: Arc<ChannelHub>,
    config: ChannelConfig,
}

impl ChannelDriver {
    pub fn new(hub: Arc<ChannelHub>, config: ChannelConfig) -> Self {
        Self { hub, config }
    }

    async fn submit(&self, target: &Target, envelope: Envelope) -> Result<()> {
        let sender = self.hub.sender_for(target).await?;
        sender
            .send(envelope)
            .await
            .map_err(|_| closed_listener(target))
    }

    /// Enqueue without waiting for room: a full queue is a submission failure.
    async fn try_submit(&self, target: &Target, envelope: Envelope) -> Result<()> {
        let sender = self.hub.sender_for(target).await?;
        sender.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                DriverError::Delivery(format!("queue on '{}' is full", target))
            }
            mpsc::error::TrySendError::Closed(_) => closed_listener(target),
        })
    }
}

fn closed_listener(target: &Target) -> DriverError {
    DriverError::Delivery(format!("listener on '{}' is closed", target))
}

#[async_trait]
impl RpcDriver for ChannelDriver {
    #[tracing::instrument(name = "channel.sync_call", skip_all, fields(target = %target, method = %method))]
    async fn sync_call(
        &self,
        ctx: &CallContext,
        target: &Target,
        method: &str,
        args: CallArgs,
    ) -> Result<Value> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            context: ctx.clone(),
            method: method.to_string(),
            args,
            reply: Some(reply_tx),
        };

        self.submit(target, envelope).await?;

        let timeout = Duration::from_secs(self.config.rpc_timeout_secs);
        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(failure))) => Err(failure.into()),
            Ok(Err(_)) => Err(DriverError::Delivery(format!(
                "listener on '{}' dropped the call",
                target
            ))),
            Err(_) => Err(DriverError::Timeout(self.config.rpc_timeout_secs)),
        }
    }

    #[tracing::instrument(name = "channel.async_call", skip_all, fields(target = %target, method = %method))]
    async fn async_call(
        &self,
        ctx: &CallContext,
        target: &Target,
        method: &str,
        args: CallArgs,
    ) -> Result<()> {
        let envelope = Envelope {
            context: ctx.clone(),
            method: method.to_string(),
            args,
            reply: None,
        };

        self.try_submit(target, envelope).await
    }

    fn name(&self) -> &str {
        CHANNEL_DRIVER
    }
}
