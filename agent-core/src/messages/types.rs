use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ProtocolVariant;

use super::connection::{Invitation, Request, Response};
use super::discovery::{Disclose, Query};
use super::basicmessage::BasicMessage;
use super::issuance::{Credential, CredentialOffer, CredentialProposal, CredentialRequest};
use super::notification::{Ack, ProblemReport};
use super::outofband::{HandshakeReuse, HandshakeReuseAccepted, OutOfBandInvitation};
use super::presentation::{Presentation, PresentationProposal, PresentationRequest};
use super::questionanswer::{Answer, Question};
use super::thread::Thread;
use super::trust_ping::{Ping, PingResponse};

/// `MessageKind` names a message without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum MessageKind {
    ConnectionInvitation,
    ConnectionRequest,
    ConnectionResponse,
    Ack,
    ProblemReport,
    Ping,
    PingResponse,
    Query,
    Disclose,
    OutOfBandInvitation,
    HandshakeReuse,
    HandshakeReuseAccepted,
    Question,
    Answer,
    BasicMessage,
    CredentialProposal,
    CredentialOffer,
    CredentialRequest,
    Credential,
    PresentationProposal,
    PresentationRequest,
    Presentation,
    Unknown,
}

/// `AgentMessage` is the internal representation of every protocol message
///
/// Messages whose type is not recognized are kept as raw JSON in [`AgentMessage::Unknown`]
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    ConnectionInvitation(Invitation),
    ConnectionRequest(Request),
    ConnectionResponse(Response),
    Ack(Ack),
    ProblemReport(ProblemReport),
    Ping(Ping),
    PingResponse(PingResponse),
    Query(Query),
    Disclose(Disclose),
    OutOfBandInvitation(OutOfBandInvitation),
    HandshakeReuse(HandshakeReuse),
    HandshakeReuseAccepted(HandshakeReuseAccepted),
    Question(Question),
    Answer(Answer),
    BasicMessage(BasicMessage),
    CredentialProposal(CredentialProposal),
    CredentialOffer(CredentialOffer),
    CredentialRequest(CredentialRequest),
    Credential(Credential),
    PresentationProposal(PresentationProposal),
    PresentationRequest(PresentationRequest),
    Presentation(Presentation),
    Unknown(Value),
}

impl AgentMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            AgentMessage::ConnectionInvitation(_) => MessageKind::ConnectionInvitation,
            AgentMessage::ConnectionRequest(_) => MessageKind::ConnectionRequest,
            AgentMessage::ConnectionResponse(_) => MessageKind::ConnectionResponse,
            AgentMessage::Ack(_) => MessageKind::Ack,
            AgentMessage::ProblemReport(_) => MessageKind::ProblemReport,
            AgentMessage::Ping(_) => MessageKind::Ping,
            AgentMessage::PingResponse(_) => MessageKind::PingResponse,
            AgentMessage::Query(_) => MessageKind::Query,
            AgentMessage::Disclose(_) => MessageKind::Disclose,
            AgentMessage::OutOfBandInvitation(_) => MessageKind::OutOfBandInvitation,
            AgentMessage::HandshakeReuse(_) => MessageKind::HandshakeReuse,
            AgentMessage::HandshakeReuseAccepted(_) => MessageKind::HandshakeReuseAccepted,
            AgentMessage::Question(_) => MessageKind::Question,
            AgentMessage::Answer(_) => MessageKind::Answer,
            AgentMessage::BasicMessage(_) => MessageKind::BasicMessage,
            AgentMessage::CredentialProposal(_) => MessageKind::CredentialProposal,
            AgentMessage::CredentialOffer(_) => MessageKind::CredentialOffer,
            AgentMessage::CredentialRequest(_) => MessageKind::CredentialRequest,
            AgentMessage::Credential(_) => MessageKind::Credential,
            AgentMessage::PresentationProposal(_) => MessageKind::PresentationProposal,
            AgentMessage::PresentationRequest(_) => MessageKind::PresentationRequest,
            AgentMessage::Presentation(_) => MessageKind::Presentation,
            AgentMessage::Unknown(_) => MessageKind::Unknown,
        }
    }

    pub fn id(&self) -> Option<String> {
        let id = match self {
            AgentMessage::ConnectionInvitation(msg) => &msg.id,
            AgentMessage::ConnectionRequest(msg) => &msg.id,
            AgentMessage::ConnectionResponse(msg) => &msg.id,
            AgentMessage::Ack(msg) => &msg.id,
            AgentMessage::ProblemReport(msg) => &msg.id,
            AgentMessage::Ping(msg) => &msg.id,
            AgentMessage::PingResponse(msg) => &msg.id,
            AgentMessage::Query(msg) => &msg.id,
            AgentMessage::Disclose(msg) => &msg.id,
            AgentMessage::OutOfBandInvitation(msg) => &msg.id,
            AgentMessage::HandshakeReuse(msg) => &msg.id,
            AgentMessage::HandshakeReuseAccepted(msg) => &msg.id,
            AgentMessage::Question(msg) => &msg.id,
            AgentMessage::Answer(msg) => &msg.id,
            AgentMessage::BasicMessage(msg) => &msg.id,
            AgentMessage::CredentialProposal(msg) => &msg.id,
            AgentMessage::CredentialOffer(msg) => &msg.id,
            AgentMessage::CredentialRequest(msg) => &msg.id,
            AgentMessage::Credential(msg) => &msg.id,
            AgentMessage::PresentationProposal(msg) => &msg.id,
            AgentMessage::PresentationRequest(msg) => &msg.id,
            AgentMessage::Presentation(msg) => &msg.id,
            AgentMessage::Unknown(raw) => {
                return raw
                    .get("@id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }
        };

        Some(id.clone())
    }

    pub fn thread(&self) -> Option<&Thread> {
        match self {
            AgentMessage::ConnectionRequest(msg) => msg.thread.as_ref(),
            AgentMessage::ConnectionResponse(msg) => Some(&msg.thread),
            AgentMessage::Ack(msg) => Some(&msg.thread),
            AgentMessage::ProblemReport(msg) => Some(&msg.thread),
            AgentMessage::Ping(msg) => msg.thread.as_ref(),
            AgentMessage::PingResponse(msg) => Some(&msg.thread),
            AgentMessage::Disclose(msg) => Some(&msg.thread),
            AgentMessage::HandshakeReuse(msg) => Some(&msg.thread),
            AgentMessage::HandshakeReuseAccepted(msg) => Some(&msg.thread),
            AgentMessage::Question(msg) => msg.thread.as_ref(),
            AgentMessage::Answer(msg) => Some(&msg.thread),
            AgentMessage::BasicMessage(msg) => msg.thread.as_ref(),
            AgentMessage::CredentialProposal(msg) => msg.thread.as_ref(),
            AgentMessage::CredentialOffer(msg) => msg.thread.as_ref(),
            AgentMessage::CredentialRequest(msg) => msg.thread.as_ref(),
            AgentMessage::Credential(msg) => msg.thread.as_ref(),
            AgentMessage::PresentationProposal(msg) => msg.thread.as_ref(),
            AgentMessage::PresentationRequest(msg) => msg.thread.as_ref(),
            AgentMessage::Presentation(msg) => msg.thread.as_ref(),
            _ => None,
        }
    }

    /// `thread_id` is the `~thread.thid` of the message, a message without a thread starts its
    /// own thread identified by its `@id`
    pub fn thread_id(&self) -> Option<String> {
        self.thread()
            .and_then(|thread| thread.thid.clone())
            .or_else(|| self.id())
    }

    /// `is_reply_to` tells if the message belongs to the given thread
    pub fn is_reply_to(&self, thread_id: &str) -> bool {
        self.thread_id().as_deref() == Some(thread_id)
    }
}

/// `Addressing` carries the DIDs required by the legacy message family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Addressing {
    pub from_did: String,
    pub to_did: String,
}

/// `Decoded` is the result of the codec `decode` operation
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub protocol: ProtocolVariant,
    pub message: AgentMessage,
    pub addressing: Option<Addressing>,
}

impl Decoded {
    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }
}
