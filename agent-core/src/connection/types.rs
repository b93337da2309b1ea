use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::capability::{Capabilities, OutboundMessage};
use crate::messages::connection::Invitation;
use crate::messages::diddoc::DidDoc;
use crate::messages::discovery::ProtocolDescriptor;
use crate::messages::outofband::OutOfBandInvitation;
use crate::messages::{self, Addressing, AgentMessage, MessageKind};
use crate::types::{AgentError, EntityAccessor, ProtocolVariant};

/// State represent the lifecycle of a pairwise connection
///
/// `Error` is terminal, it is reached when a handshake message was malformed or rejected
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Null,
    Invited,
    Requested,
    Responded,
    Completed,
    Error,
}

impl State {
    pub fn code(&self) -> u32 {
        match self {
            State::Null => 0,
            State::Invited => 1,
            State::Requested => 2,
            State::Responded => 3,
            State::Completed => 4,
            State::Error => 5,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Inviter,
    Invitee,
}

/// `InvitationPayload` keeps the invitation created by an inviter or received by an invitee
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum InvitationPayload {
    Connection(Invitation),
    OutOfBand(OutOfBandInvitation),
}

impl InvitationPayload {
    pub fn id(&self) -> String {
        match self {
            InvitationPayload::Connection(invitation) => invitation.id.clone(),
            InvitationPayload::OutOfBand(invitation) => invitation.id.clone(),
        }
    }

    pub fn to_message(&self) -> AgentMessage {
        match self {
            InvitationPayload::Connection(invitation) => {
                AgentMessage::ConnectionInvitation(invitation.clone())
            }
            InvitationPayload::OutOfBand(invitation) => {
                AgentMessage::OutOfBandInvitation(invitation.clone())
            }
        }
    }

    /// `route` is the destination of the messages sent before the peer DID document is known
    pub fn route(&self) -> Result<Route, AgentError> {
        let route = match self {
            InvitationPayload::Connection(invitation) => Route {
                recipient_keys: invitation.recipient_keys.clone(),
                routing_keys: invitation.routing_keys.clone(),
                endpoint: invitation.service_endpoint.clone(),
            },
            InvitationPayload::OutOfBand(invitation) => {
                let service = invitation.service.first().ok_or_else(|| {
                    AgentError::malformed("service", "invitation without service")
                })?;

                Route {
                    recipient_keys: service.recipient_keys.clone(),
                    routing_keys: service.routing_keys.clone(),
                    endpoint: service.service_endpoint.clone(),
                }
            }
        };

        route.validate()?;
        Ok(route)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub recipient_keys: Vec<String>,
    pub routing_keys: Vec<String>,
    pub endpoint: String,
}

impl Route {
    pub fn from_did_doc(doc: &DidDoc) -> Self {
        Self {
            recipient_keys: doc.recipient_keys(),
            routing_keys: doc.routing_keys(),
            endpoint: doc.endpoint().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.recipient_keys.is_empty() {
            return Err(AgentError::malformed("recipientKeys", "no recipient key"));
        }

        if self.endpoint.is_empty() {
            return Err(AgentError::malformed("serviceEndpoint", "empty endpoint"));
        }

        Ok(())
    }
}

/// `Peer` is what we know about the other side of the connection
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Peer {
    pub did: String,
    pub label: String,
    pub did_doc: DidDoc,
}

impl Peer {
    pub fn verkey(&self) -> String {
        self.did_doc
            .recipient_keys()
            .first()
            .cloned()
            .unwrap_or_default()
    }
}

/// `ConnectionEntityAccessor` gives read access to the connection properties
pub trait ConnectionEntityAccessor: EntityAccessor<State = State> {
    fn get_actor(&self) -> Actor;
    fn get_invitation(&self) -> Option<InvitationPayload>;
    fn get_my_did(&self) -> Option<String>;
    fn get_my_verkey(&self) -> Option<String>;
    fn get_their_did(&self) -> Option<String>;
    fn get_their_verkey(&self) -> Option<String>;
    fn get_remote_protocols(&self) -> Vec<ProtocolDescriptor>;
    fn get_pending_messages(&self) -> HashMap<String, MessageKind>;
}

/// `CompletedConnection` is a snapshot of a completed connection, it is everything the credential
/// and proof exchanges need to talk to the peer
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CompletedConnection {
    pub protocol: ProtocolVariant,
    pub my_did: String,
    pub my_verkey: String,
    pub their_did: String,
    pub their_verkey: String,
    pub route: Route,
}

impl CompletedConnection {
    pub fn addressing(&self) -> Addressing {
        Addressing {
            from_did: self.my_did.clone(),
            to_did: self.their_did.clone(),
        }
    }

    pub async fn send(
        &self,
        caps: &Capabilities,
        message: &AgentMessage,
    ) -> Result<(), AgentError> {
        deliver(
            caps,
            self.protocol,
            &self.addressing(),
            &self.my_verkey,
            &self.route,
            message,
        )
        .await
    }
}

/// `deliver` encodes the message for the given protocol family and hands it to the transport
pub async fn deliver(
    caps: &Capabilities,
    protocol: ProtocolVariant,
    addressing: &Addressing,
    sender_verkey: &str,
    route: &Route,
    message: &AgentMessage,
) -> Result<(), AgentError> {
    let payload = messages::encode(protocol, message, addressing)?;
    debug!(
        "[transport] sending {} from {} to {}",
        message.kind(),
        sender_verkey,
        route.endpoint
    );
    trace!("[transport] payload: {}", payload);

    caps.transport
        .send(OutboundMessage {
            sender_verkey: sender_verkey.to_string(),
            recipient_keys: route.recipient_keys.clone(),
            routing_keys: route.routing_keys.clone(),
            endpoint: route.endpoint.clone(),
            payload,
        })
        .await
}
