use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::AgentError;

/// `OutboundMessage` is an encoded protocol message plus everything needed to route it.
/// Packing the payload for the recipient keys is a concern of the transport implementation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub sender_verkey: String,
    pub recipient_keys: Vec<String>,
    pub routing_keys: Vec<String>,
    pub endpoint: String,
    pub payload: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub uid: String,
    pub payload: String,
}

/// `TransportBuilder` delivers messages to a peer endpoint and polls the messages addressed to
/// one of our keys
///
/// A timeout is reported as [`AgentError::TransportFailure`], it is never retried by the engine
#[async_trait]
pub trait TransportBuilder: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), AgentError>;

    /// `poll` returns the messages not consumed yet, in arrival order
    async fn poll(&self, recipient_verkey: &str) -> Result<Vec<InboundMessage>, AgentError>;

    async fn mark_consumed(&self, recipient_verkey: &str, uids: Vec<String>)
        -> Result<(), AgentError>;
}
