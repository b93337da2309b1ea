//! `inbound` drives the replay of inbound messages through an entity state machine
//!
//! Polling policy:
//!
//! - messages are replayed in the order returned by the transport
//! - the replay stops at the first message changing the entity state, one transition per call
//! - messages owned by the entity are marked consumed, unrelated messages stay queued
//! - a message whose `@id` was already applied is consumed without effect
//! - a message that cannot be decoded is consumed and skipped
//!
//! A connection moves to its error state on an undecodable message given by the caller, an
//! exchange only logs it since the message cannot be attributed to the exchange thread
use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capability::Capabilities;
use crate::messages::{self, AgentMessage};
use crate::types::{AgentError, EntityAccessor};

const PROCESSED_HISTORY: usize = 256;

/// `Applied` describes the effect of an inbound message on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub transitioned: bool,
    pub consumed: bool,
}

impl Applied {
    /// a transition triggered by a message owned by the entity
    pub fn transition() -> Self {
        Self {
            transitioned: true,
            consumed: true,
        }
    }

    /// a transition triggered by a message owned by another entity
    pub fn observed() -> Self {
        Self {
            transitioned: true,
            consumed: false,
        }
    }

    pub fn handled() -> Self {
        Self {
            transitioned: false,
            consumed: true,
        }
    }

    pub fn ignored() -> Self {
        Self {
            transitioned: false,
            consumed: false,
        }
    }
}

/// `ProcessedMessages` remembers the ids of the latest applied messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedMessages(VecDeque<String>);

impl ProcessedMessages {
    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|processed| processed == id)
    }

    pub fn remember(&mut self, id: String) {
        if self.contains(&id) {
            return;
        }

        if self.0.len() >= PROCESSED_HISTORY {
            self.0.pop_front();
        }

        self.0.push_back(id);
    }
}

#[async_trait]
pub trait MessageHandler: EntityAccessor {
    /// `apply` classifies the message and runs the matching transition
    async fn apply(
        &mut self,
        caps: &Capabilities,
        message: AgentMessage,
    ) -> Result<Applied, AgentError>;

    /// `on_malformed` is called when a message given directly by the caller cannot be decoded
    fn on_malformed(&mut self, err: &AgentError);

    fn processed(&self) -> &ProcessedMessages;
    fn processed_mut(&mut self) -> &mut ProcessedMessages;
}

/// `apply_raw` decodes and applies a message given directly by the caller
pub async fn apply_raw<H: MessageHandler>(
    handler: &mut H,
    caps: &Capabilities,
    raw: &str,
) -> Result<Applied, AgentError> {
    let decoded = match messages::decode(raw) {
        Ok(decoded) => decoded,
        Err(err) => {
            handler.on_malformed(&err);
            return Err(err);
        }
    };

    apply_message(handler, caps, decoded.message).await
}

pub async fn apply_message<H: MessageHandler>(
    handler: &mut H,
    caps: &Capabilities,
    message: AgentMessage,
) -> Result<Applied, AgentError> {
    let id = message.id();
    if let Some(id) = &id {
        if handler.processed().contains(id) {
            debug!("[{}] message {} already applied", handler.get_source_id(), id);
            return Ok(Applied::handled());
        }
    }

    let applied = handler.apply(caps, message).await?;
    if applied.consumed {
        if let Some(id) = id {
            handler.processed_mut().remember(id);
        }
    }

    Ok(applied)
}

/// `poll_once` replays the queued messages of `recipient_verkey` until one of them changes the
/// entity state, it returns `true` when a transition happened
pub async fn poll_once<H: MessageHandler>(
    handler: &mut H,
    caps: &Capabilities,
    recipient_verkey: &str,
) -> Result<bool, AgentError> {
    let inbound = caps.transport.poll(recipient_verkey).await?;
    let mut consumed = vec![];
    let mut transitioned = false;

    for message in inbound {
        let decoded = match messages::decode(&message.payload) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(
                    "[{}] skipping undecodable message {}: {}",
                    handler.get_source_id(),
                    message.uid,
                    err
                );
                consumed.push(message.uid);
                continue;
            }
        };

        match apply_message(handler, caps, decoded.message).await {
            Ok(applied) => {
                if applied.consumed {
                    consumed.push(message.uid);
                }

                if applied.transitioned {
                    transitioned = true;
                    break;
                }
            }
            Err(err) => {
                if handler.is_failed() {
                    consumed.push(message.uid);
                    if let Err(mark_err) = caps.transport.mark_consumed(recipient_verkey, consumed).await {
                        warn!("[{}] unable to mark messages consumed: {}", handler.get_source_id(), mark_err);
                    }
                }

                return Err(err);
            }
        }
    }

    if !consumed.is_empty() {
        caps.transport.mark_consumed(recipient_verkey, consumed).await?;
    }

    Ok(transitioned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_messages_history() {
        let mut processed = ProcessedMessages::default();
        processed.remember("a".to_string());
        processed.remember("a".to_string());
        assert!(processed.contains("a"));

        for idx in 0..PROCESSED_HISTORY {
            processed.remember(format!("msg-{}", idx));
        }

        assert!(!processed.contains("a"));
        assert!(processed.contains(&format!("msg-{}", PROCESSED_HISTORY - 1)));
    }
}
