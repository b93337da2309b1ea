use serde::{Deserialize, Serialize};

use super::attachment::Attachments;
use super::diddoc::Service;
use super::thread::Thread;

/// `OutOfBandInvitation` may embed a ready to process protocol message in `request~attach`
///
/// An invitation without any handshake protocol only carries its attached request, accepting it
/// creates a one-time connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutOfBandInvitation {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,

    #[serde(default)]
    pub handshake_protocols: Vec<String>,

    #[serde(rename = "request~attach", default)]
    pub request_attach: Attachments,

    pub service: Vec<Service>,

    #[serde(rename = "public_did", default, skip_serializing_if = "Option::is_none")]
    pub public_did: Option<String>,
}

impl OutOfBandInvitation {
    pub fn requires_handshake(&self) -> bool {
        !self.handshake_protocols.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandshakeReuse {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandshakeReuseAccepted {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}
