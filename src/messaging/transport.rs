//! Request/reply transport seam
//!
//! The gateway and the orchestrator talk to their downstream services through
//! the `RequestTransport` trait; services expose themselves as `RequestHandler`s.
//! Production binds both sides to AMQP (see `rpc`), while the standalone role
//! and the tests run everything over the in-process transport below.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Transport-level failures, classified at exactly one point by each caller
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request on {channel} timed out after {timeout_ms}ms")]
    Timeout { channel: String, timeout_ms: u64 },

    #[error("transport failure on {channel}: {message}")]
    Failed { channel: String, message: String },
}

/// Sends a request payload to a named channel and waits for the reply.
///
/// A timeout here never cancels work in progress on the callee side; the
/// callee may still complete its side effect after the caller gave up.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    async fn request(
        &self,
        channel: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> std::result::Result<Vec<u8>, TransportError>;
}

/// Serves one or more request channels, producing a reply payload per request
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, channel: &str, payload: &[u8]) -> Result<Vec<u8>>;
}

/// In-process transport: a registry of handlers keyed by channel name.
///
/// Used by the standalone role and the test suite; semantics match the AMQP
/// transport (bounded wait, handler keeps running past a caller timeout).
#[derive(Default)]
pub struct InProcessTransport {
    handlers: RwLock<HashMap<String, Arc<dyn RequestHandler>>>,
}

impl InProcessTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to a channel, replacing any previous binding
    pub async fn register(&self, channel: &str, handler: Arc<dyn RequestHandler>) {
        self.handlers
            .write()
            .await
            .insert(channel.to_string(), handler);
        debug!(channel, "registered in-process handler");
    }
}

#[async_trait]
impl RequestTransport for InProcessTransport {
    async fn request(
        &self,
        channel: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let handler = {
            let handlers = self.handlers.read().await;
            handlers.get(channel).cloned()
        };

        let handler = handler.ok_or_else(|| TransportError::Failed {
            channel: channel.to_string(),
            message: "no handler bound to channel".to_string(),
        })?;

        // The handler runs as its own task so a caller timeout abandons it
        // rather than cancelling it; its side effect may still complete,
        // matching the broker transport where the consumer keeps going.
        let task_channel = channel.to_string();
        let task = tokio::spawn(async move { handler.handle(&task_channel, &payload).await });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(reply))) => Ok(reply),
            Ok(Ok(Err(e))) => Err(TransportError::Failed {
                channel: channel.to_string(),
                message: e.to_string(),
            }),
            Ok(Err(e)) => Err(TransportError::Failed {
                channel: channel.to_string(),
                message: format!("handler task failed: {e}"),
            }),
            Err(_) => Err(TransportError::Timeout {
                channel: channel.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
