//! AMQP request/reply plumbing
//!
//! Requests are published to the channel's queue on the default exchange with
//! a `reply_to` of the broker's direct reply-to pseudo queue; replies are
//! matched back to waiting callers by correlation id. The server side consumes
//! a channel queue and hands each delivery to a `RequestHandler`, publishing
//! the handler's reply to the delivery's `reply_to`.

use crate::error::Result;
use crate::messaging::transport::{RequestHandler, RequestTransport, TransportError};
use amqprs::channel::{
    BasicConsumeArguments, BasicPublishArguments, Channel, QueueDeclareArguments,
};
use amqprs::consumer::AsyncConsumer;
use amqprs::{BasicProperties, Deliver};
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// RabbitMQ direct reply-to pseudo queue
const REPLY_TO_QUEUE: &str = "amq.rabbitmq.reply-to";

type PendingReplies = Arc<Mutex<HashMap<String, oneshot::Sender<Vec<u8>>>>>;

/// Broker-backed request/reply client
pub struct AmqpRequestTransport {
    channel: Channel,
    pending: PendingReplies,
}

impl AmqpRequestTransport {
    /// Create a transport on the given channel and start consuming replies.
    ///
    /// The reply consumer must be running before the first publish; the broker
    /// rejects direct reply-to publishes from channels without one.
    pub async fn new(channel: Channel) -> Result<Self> {
        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));

        let consumer_tag = format!("reply-consumer-{}", Uuid::new_v4());
        let args = BasicConsumeArguments::new(REPLY_TO_QUEUE, &consumer_tag)
            .manual_ack(false)
            .finish();
        channel
            .basic_consume(
                ReplyConsumer {
                    pending: pending.clone(),
                },
                args,
            )
            .await
            .context("failed to start direct reply-to consumer")?;

        Ok(Self { channel, pending })
    }

    fn forget(&self, request_id: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(request_id);
        }
    }
}

#[async_trait]
impl RequestTransport for AmqpRequestTransport {
    async fn request(
        &self,
        channel: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let request_id = Uuid::new_v4().to_string();
        let (reply_tx, reply_rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().map_err(|_| TransportError::Failed {
                channel: channel.to_string(),
                message: "pending replies lock poisoned".to_string(),
            })?;
            pending.insert(request_id.clone(), reply_tx);
        }

        let args = BasicPublishArguments::new("", channel);
        let mut properties = BasicProperties::default();
        properties
            .with_correlation_id(&request_id)
            .with_reply_to(REPLY_TO_QUEUE)
            .with_content_type("application/json");

        if let Err(e) = self.channel.basic_publish(properties, payload, args).await {
            self.forget(&request_id);
            return Err(TransportError::Failed {
                channel: channel.to_string(),
                message: format!("publish failed: {e}"),
            });
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => {
                self.forget(&request_id);
                Err(TransportError::Failed {
                    channel: channel.to_string(),
                    message: "reply channel closed".to_string(),
                })
            }
            Err(_) => {
                self.forget(&request_id);
                Err(TransportError::Timeout {
                    channel: channel.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

/// Consumer matching direct reply-to deliveries against pending requests
struct ReplyConsumer {
    pending: PendingReplies,
}

#[async_trait]
impl AsyncConsumer for ReplyConsumer {
    async fn consume(
        &mut self,
        _channel: &Channel,
        _deliver: Deliver,
        basic_properties: BasicProperties,
        content: Vec<u8>,
    ) {
        let Some(correlation_id) = basic_properties.correlation_id().cloned() else {
            warn!("dropping reply without correlation id");
            return;
        };

        let waiter = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&correlation_id));

        match waiter {
            // Send fails only when the requester already timed out.
            Some(tx) => {
                let _ = tx.send(content);
            }
            None => debug!(
                correlation_id = %correlation_id,
                "reply arrived after the requester gave up"
            ),
        }
    }
}

/// Declare a channel's queue and serve it with the given handler.
///
/// Replies go to each delivery's `reply_to` with its correlation id copied
/// over. Handler errors are logged and produce no reply; the caller's timeout
/// covers that case.
pub async fn serve_channel(
    channel: &Channel,
    queue: &str,
    handler: Arc<dyn RequestHandler>,
) -> Result<()> {
    channel
        .queue_declare(QueueDeclareArguments::new(queue))
        .await
        .with_context(|| format!("failed to declare queue {queue}"))?;

    let consumer_tag = format!("{}-{}", queue, Uuid::new_v4());
    let args = BasicConsumeArguments::new(queue, &consumer_tag)
        .manual_ack(false)
        .finish();
    channel
        .basic_consume(
            RequestConsumer {
                queue: queue.to_string(),
                handler,
            },
            args,
        )
        .await
        .with_context(|| format!("failed to start consuming {queue}"))?;

    info!(queue, "serving request channel");
    Ok(())
}

/// Consumer dispatching request deliveries to a handler
struct RequestConsumer {
    queue: String,
    handler: Arc<dyn RequestHandler>,
}

#[async_trait]
impl AsyncConsumer for RequestConsumer {
    async fn consume(
        &mut self,
        channel: &Channel,
        deliver: Deliver,
        basic_properties: BasicProperties,
        content: Vec<u8>,
    ) {
        let reply_to = basic_properties.reply_to().cloned();
        let correlation_id = basic_properties.correlation_id().cloned();

        debug!(
            queue = %self.queue,
            delivery_tag = deliver.delivery_tag(),
            size = content.len(),
            "request received"
        );

        let reply = match self.handler.handle(&self.queue, &content).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(queue = %self.queue, "request handler failed: {e:#}");
                return;
            }
        };

        let Some(reply_to) = reply_to else {
            warn!(queue = %self.queue, "request without reply_to, dropping reply");
            return;
        };

        let args = BasicPublishArguments::new("", &reply_to);
        let mut properties = BasicProperties::default();
        properties.with_content_type("application/json");
        if let Some(id) = &correlation_id {
            properties.with_correlation_id(id);
        }

        if let Err(e) = channel.basic_publish(properties, reply, args).await {
            error!(queue = %self.queue, "failed to publish reply: {e}");
        }
    }
}

// Broker round trips are exercised by deployment smoke tests; the in-process
// transport covers the request/reply semantics in this suite.
