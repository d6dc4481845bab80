//! Cross-service messaging: envelopes, transports, and AMQP plumbing

pub mod connection;
pub mod envelope;
pub mod rpc;
pub mod transport;

// Re-export commonly used types
pub use connection::AmqpConnection;
pub use envelope::{MessageEnvelope, MessageMeta, MessageType, ResponseEnvelope};
pub use transport::{InProcessTransport, RequestHandler, RequestTransport, TransportError};
