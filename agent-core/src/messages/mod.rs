//! `messages` is the codec of the protocol messages exchanged between agents
//!
//! Two message families are supported side by side:
//!
//! - the Aries `DIDComm` family, identified by an `@type` URI
//! - the legacy proprietary family, identified by a `msg_type` and `version` pair
//!
//! Both families are decoded into the same [`AgentMessage`] representation. Attachments keep their
//! wire encoding until a state transition asks for their content.
pub mod attachment;
pub mod basicmessage;
pub mod connection;
pub mod diddoc;
pub mod discovery;
pub mod issuance;
pub mod message_type;
pub mod notification;
pub mod outofband;
pub mod presentation;
pub mod questionanswer;
pub mod thread;
pub mod trust_ping;

pub mod legacy;

pub mod types;
pub use types::{Addressing, AgentMessage, Decoded, MessageKind};

mod codec;
pub use codec::{decode, decode_value, encode};

/// `new_id` generates the `@id` of an outbound message
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
