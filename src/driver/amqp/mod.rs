//! AMQP (RabbitMQ) driver implementation.
//!
//! Calls are published as JSON envelopes to a topic exchange with the
//! target's routing key. Sync calls wait for the reply on RabbitMQ's direct
//! reply-to pseudo queue, matched by correlation id.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use deadpool_lapin::{Manager, Pool, PoolError};
use futures::StreamExt;
use lapin::{
    options::{BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, ConnectionProperties, ExchangeKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{CallArgs, DriverError, Result, RpcDriver, Target, AMQP_DRIVER};
use crate::config::AmqpConfig;
use crate::context::CallContext;

/// RabbitMQ pseudo queue for direct replies.
const DIRECT_REPLY_TO: &str = "amq.rabbitmq.reply-to";
const CONTENT_TYPE: &str = "application/json";

/// Call as it travels on the wire.
#[derive(Debug, Serialize)]
struct RequestEnvelope<'a> {
    method: &'a str,
    args: &'a CallArgs,
    context: &'a CallContext,
    version: Option<&'a str>,
}

/// Reply sent back by the remote service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ReplyEnvelope {
    Result(Value),
    Failure { exc_type: String, message: String },
}

fn encode_request(
    ctx: &CallContext,
    target: &Target,
    method: &str,
    args: &CallArgs,
) -> Result<Vec<u8>> {
    let envelope = RequestEnvelope {
        method,
        args,
        context: ctx,
        version: target.version.as_deref(),
    };
    serde_json::to_vec(&envelope).map_err(|e| DriverError::Serialization(e.to_string()))
}

fn decode_reply(data: &[u8]) -> Result<Value> {
    match serde_json::from_slice::<ReplyEnvelope>(data) {
        Ok(ReplyEnvelope::Result(value)) => Ok(value),
        Ok(ReplyEnvelope::Failure { exc_type, message }) => {
            Err(DriverError::Remote { exc_type, message })
        }
        Err(e) => Err(DriverError::Serialization(format!("malformed reply: {}", e))),
    }
}

/// AMQP driver using RabbitMQ.
///
/// Construction performs no I/O; the pool connects and the exchange is
/// declared on the first call.
pub struct AmqpDriver {
    pool: Pool,
    config: AmqpConfig,
    exchange_declared: OnceCell<()>,
}

impl AmqpDriver {
    /// Create a new AMQP driver.
    pub fn new(config: AmqpConfig) -> Result<Self> {
        let manager = Manager::new(config.url.clone(), ConnectionProperties::default());
        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .build()
            .map_err(|e| DriverError::Connection(format!("Failed to create pool: {}", e)))?;

        Ok(Self {
            pool,
            config,
            exchange_declared: OnceCell::new(),
        })
    }

    /// Get a channel from the pool, declaring the exchange on first use.
    async fn channel(&self) -> Result<Channel> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(3)
            .with_jitter();

        let conn = (|| async { self.pool.get().await })
            .retry(backoff)
            .notify(|e: &PoolError, delay: Duration| {
                warn!(error = %e, backoff_ms = %delay.as_millis(), "AMQP connection failed, retrying");
            })
            .await
            .map_err(|e: PoolError| {
                DriverError::Connection(format!("Failed to get connection from pool: {}", e))
            })?;

        let channel = conn
            .create_channel()
            .await
            .map_err(|e| DriverError::Connection(format!("Failed to create channel: {}", e)))?;

        self.exchange_declared
            .get_or_try_init(|| async {
                channel
                    .exchange_declare(
                        &self.config.exchange,
                        ExchangeKind::Topic,
                        ExchangeDeclareOptions {
                            durable: true,
                            ..Default::default()
                        },
                        FieldTable::default(),
                    )
                    .await?;
                info!(
                    exchange = %self.config.exchange,
                    url = %self.config.url,
                    "Connected to AMQP"
                );
                Ok::<(), lapin::Error>(())
            })
            .await
            .map_err(|e| DriverError::Connection(format!("Failed to declare exchange: {}", e)))?;

        Ok(channel)
    }

    async fn publish(
        &self,
        channel: &Channel,
        target: &Target,
        payload: &[u8],
        properties: BasicProperties,
    ) -> Result<()> {
        let routing_key = target.routing_key();

        // Publisher confirms are not enabled on pooled channels.
        let _confirm = channel
            .basic_publish(
                &self.config.exchange,
                &routing_key,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await
            .map_err(|e| DriverError::Delivery(format!("Failed to publish: {}", e)))?;

        debug!(
            exchange = %self.config.exchange,
            routing_key = %routing_key,
            "Published call"
        );

        Ok(())
    }

    /// Publish a call on `channel` and wait for its correlated reply.
    async fn request_reply(
        &self,
        channel: &Channel,
        target: &Target,
        payload: &[u8],
    ) -> Result<Value> {
        let correlation_id = uuid::Uuid::new_v4().to_string();

        // Direct reply-to requires consuming before publishing on the same channel.
        let mut replies = channel
            .basic_consume(
                DIRECT_REPLY_TO,
                &format!("rpc-reply-{}", correlation_id),
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| DriverError::Connection(format!("Failed to consume replies: {}", e)))?;

        let properties = BasicProperties::default()
            .with_content_type(CONTENT_TYPE.into())
            .with_reply_to(DIRECT_REPLY_TO.into())
            .with_correlation_id(correlation_id.clone().into());

        self.publish(channel, target, payload, properties).await?;

        let wait_for_reply = async {
            while let Some(delivery) = replies.next().await {
                let delivery = delivery
                    .map_err(|e| DriverError::Delivery(format!("Reply consumer failed: {}", e)))?;

                let matches = delivery
                    .properties
                    .correlation_id()
                    .as_ref()
                    .is_some_and(|id| id.as_str() == correlation_id);

                if matches {
                    return decode_reply(&delivery.data);
                }
                debug!("Discarding reply with foreign correlation id");
            }
            Err(DriverError::Delivery("reply consumer closed".to_string()))
        };

        let timeout = Duration::from_secs(self.config.rpc_timeout_secs);
        tokio::time::timeout(timeout, wait_for_reply)
            .await
            .map_err(|_| DriverError::Timeout(self.config.rpc_timeout_secs))?
    }
}

#[async_trait]
impl RpcDriver for AmqpDriver {
    #[tracing::instrument(name = "amqp.sync_call", skip_all, fields(target = %target, method = %method))]
    async fn sync_call(
        &self,
        ctx: &CallContext,
        target: &Target,
        method: &str,
        args: CallArgs,
    ) -> Result<Value> {
        let payload = encode_request(ctx, target, method, &args)?;
        let channel = self.channel().await?;

        let reply = self.request_reply(&channel, target, &payload).await;

        if let Err(e) = channel.close(200, "OK").await {
            debug!(error = %e, "Failed to close reply channel");
        }

        reply
    }

    #[tracing::instrument(name = "amqp.async_call", skip_all, fields(target = %target, method = %method))]
    async fn async_call(
        &self,
        ctx: &CallContext,
        target: &Target,
        method: &str,
        args: CallArgs,
    ) -> Result<()> {
        let payload = encode_request(ctx, target, method, &args)?;
        let channel = self.channel().await?;

        let properties = BasicProperties::default()
            .with_content_type(CONTENT_TYPE.into())
            .with_delivery_mode(2); // persistent

        let published = self.publish(&channel, target, &payload, properties).await;

        if let Err(e) = channel.close(200, "OK").await {
            debug!(error = %e, "Failed to close publish channel");
        }

        published
    }

    fn name(&self) -> &str {
        AMQP_DRIVER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_layout() {
        let ctx = CallContext::new().with("user_id", "alice");
        let target = Target::new("workflow_engine").with_version("1.0");
        let mut args = CallArgs::new();
        args.insert("execution_id".to_string(), json!("ex-1"));

        let bytes = encode_request(&ctx, &target, "pause_workflow", &args).unwrap();
        let decoded: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            decoded,
            json!({
                "method": "pause_workflow",
                "args": {"execution_id": "ex-1"},
                "context": {"user_id": "alice"},
                "version": "1.0"
            })
        );
    }

    #[test]
    fn test_decode_result_reply() {
        let reply = decode_reply(br#"{"result": {"id": "ex-1", "state": "PAUSED"}}"#).unwrap();
        assert_eq!(reply, json!({"id": "ex-1", "state": "PAUSED"}));
    }

    #[test]
    fn test_decode_failure_reply() {
        let reply = decode_reply(
            br#"{"failure": {"exc_type": "WorkflowException", "message": "invalid transition"}}"#,
        );
        assert_eq!(
            reply,
            Err(DriverError::Remote {
                exc_type: "WorkflowException".to_string(),
                message: "invalid transition".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_malformed_reply() {
        let reply = decode_reply(b"not json");
        assert!(matches!(reply, Err(DriverError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_new_performs_no_io() {
        let config = AmqpConfig {
            url: "amqp://unreachable.invalid:5672".to_string(),
            ..AmqpConfig::default()
        };

        let driver = AmqpDriver::new(config).unwrap();

        assert_eq!(driver.name(), "amqp");
    }
}
