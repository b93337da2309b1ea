use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rstdev_domain::BaseError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capability::crypto::PairwiseInfo;
use crate::capability::Capabilities;
use crate::inbound::{self, Applied, MessageHandler, ProcessedMessages};
use crate::messages::basicmessage::BasicMessage;
use crate::messages::connection::{
    ConnectionData, ConnectionSignature, Invitation, Request, Response,
};
use crate::messages::diddoc::{DidDoc, CONTEXT};
use crate::messages::discovery::{Disclose, ProtocolDescriptor, Query};
use crate::messages::message_type::{supported_protocols, MessageFamily};
use crate::messages::notification::{Ack, AckStatus, ProblemReport};
use crate::messages::outofband::{HandshakeReuse, HandshakeReuseAccepted, OutOfBandInvitation};
use crate::messages::questionanswer::{Answer, Question};
use crate::messages::thread::Thread;
use crate::messages::trust_ping::{Ping, PingResponse};
use crate::messages::{self, Addressing, AgentMessage, MessageKind};
use crate::types::{AgentError, EntityAccessor, ProtocolVariant, ToJSON};

use super::types::{
    deliver, Actor, CompletedConnection, ConnectionEntityAccessor, InvitationPayload, Peer, Route,
    State,
};

/// `Connection` is a pairwise channel between our agent and a single peer
///
/// The entity is driven by two kind of events, local operations (`connect`, `accept_one_time`,
/// the side channel sends) and inbound messages (`update_state`, `update_state_with_message`).
/// Its serialized form is its complete snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    source_id: String,
    protocol: ProtocolVariant,
    actor: Actor,
    state: State,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    invitation: Option<InvitationPayload>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pairwise: Option<PairwiseInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    peer: Option<Peer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    handshake_thread: Option<String>,

    #[serde(default)]
    one_time: bool,

    #[serde(default)]
    one_time_accepted: bool,

    #[serde(default)]
    pending_messages: HashMap<String, MessageKind>,

    #[serde(default)]
    remote_protocols: Vec<ProtocolDescriptor>,

    #[serde(default)]
    processed: ProcessedMessages,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    problem: Option<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Connection {
    fn new(source_id: &str, protocol: ProtocolVariant, actor: Actor) -> Self {
        let now = Utc::now();
        Self {
            source_id: source_id.to_string(),
            protocol,
            actor,
            state: State::Null,
            invitation: None,
            pairwise: None,
            peer: None,
            handshake_thread: None,
            one_time: false,
            one_time_accepted: false,
            pending_messages: HashMap::new(),
            remote_protocols: vec![],
            processed: ProcessedMessages::default(),
            problem: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `create_inviter` builds a new connection and its invitation, the connection is `Invited`
    /// once this function returns
    pub async fn create_inviter(
        caps: &Capabilities,
        source_id: &str,
        protocol: ProtocolVariant,
    ) -> Result<Self, AgentError> {
        Self::check_profile(caps)?;

        let mut connection = Self::new(source_id, protocol, Actor::Inviter);
        let pairwise = caps.crypto.create_pairwise_did().await?;

        connection.invitation = Some(InvitationPayload::Connection(Invitation {
            id: messages::new_id(),
            label: caps.profile.label.clone(),
            recipient_keys: vec![pairwise.verkey.clone()],
            routing_keys: caps.profile.routing_keys.clone(),
            service_endpoint: caps.profile.endpoint.clone(),
        }));
        connection.pairwise = Some(pairwise);
        connection.set_state(State::Invited);

        info!("[connection:{}] invitation created", connection.source_id);
        Ok(connection)
    }

    /// `create_outofband` builds an out-of-band invitation using the `connections` handshake,
    /// optionally carrying an attached protocol message
    pub async fn create_outofband(
        caps: &Capabilities,
        source_id: &str,
        goal_code: Option<String>,
        goal: Option<String>,
        attachment: Option<AgentMessage>,
    ) -> Result<Self, AgentError> {
        Self::check_profile(caps)?;

        let mut connection = Self::new(source_id, ProtocolVariant::Aries, Actor::Inviter);
        let pairwise = caps.crypto.create_pairwise_did().await?;

        let mut request_attach = messages::attachment::Attachments::new();
        if let Some(message) = attachment {
            let raw = messages::encode(ProtocolVariant::Aries, &message, &Addressing::default())?;
            let value = serde_json::from_str(&raw)
                .map_err(|err| AgentError::SerializationError(err.to_string()))?;

            request_attach.push(messages::attachment::Attachment::from_json(
                "request-0",
                &value,
            ));
        }

        let service = DidDoc::new(
            &pairwise.did,
            &pairwise.verkey,
            &caps.profile.endpoint,
            caps.profile.routing_keys.clone(),
        )
        .service;

        connection.invitation = Some(InvitationPayload::OutOfBand(OutOfBandInvitation {
            id: messages::new_id(),
            label: Some(caps.profile.label.clone()),
            goal_code,
            goal,
            handshake_protocols: vec![MessageFamily::Connections.protocol_id()],
            request_attach,
            service,
            public_did: None,
        }));
        connection.pairwise = Some(pairwise);
        connection.set_state(State::Invited);

        info!("[connection:{}] out-of-band invitation created", connection.source_id);
        Ok(connection)
    }

    /// `create_with_invite` builds the invitee side from a received invitation
    ///
    /// An out-of-band invitation without any handshake protocol creates a one-time connection left
    /// in `Null` until [`Connection::accept_one_time`] is called
    pub fn create_with_invite(source_id: &str, raw_invite: &str) -> Result<Self, AgentError> {
        let decoded = messages::decode(raw_invite)?;

        let mut connection = Self::new(source_id, decoded.protocol, Actor::Invitee);
        let invitation = match decoded.message {
            AgentMessage::ConnectionInvitation(invitation) => {
                InvitationPayload::Connection(invitation)
            }
            AgentMessage::OutOfBandInvitation(invitation) => {
                if !invitation.requires_handshake() {
                    if invitation.request_attach.is_empty() {
                        return Err(AgentError::malformed(
                            "request~attach",
                            "invitation has neither a handshake protocol nor an attached request",
                        ));
                    }

                    connection.one_time = true;
                }

                InvitationPayload::OutOfBand(invitation)
            }
            other => {
                return Err(AgentError::InvalidInput(format!(
                    "expected an invitation, got: {}",
                    other.kind()
                )))
            }
        };

        invitation.route()?;
        connection.invitation = Some(invitation);
        if !connection.one_time {
            connection.set_state(State::Invited);
        }

        debug!(
            "[connection:{}] created from invitation, one-time: {}",
            connection.source_id, connection.one_time
        );
        Ok(connection)
    }

    /// `connect` sends the connection request of an invitee
    pub async fn connect(&mut self, caps: &Capabilities) -> Result<(), AgentError> {
        self.ensure_active()?;

        if self.one_time {
            return Err(AgentError::ActionNotSupported(
                "one-time out-of-band connections are accepted, not connected".to_string(),
            ));
        }

        match (self.actor, self.state) {
            (Actor::Inviter, State::Invited) => Ok(()),
            (Actor::Invitee, State::Invited) => self.send_request(caps).await,
            _ => Err(self.invalid_state("connect")),
        }
    }

    /// `accept_one_time` completes a one-time out-of-band connection and returns the attached
    /// request. A second call fails with `AgentError::ActionNotSupported`
    pub async fn accept_one_time(
        &mut self,
        caps: &Capabilities,
    ) -> Result<AgentMessage, AgentError> {
        self.ensure_active()?;

        if !self.one_time {
            return Err(AgentError::ActionNotSupported(
                "accept is only available for one-time out-of-band connections".to_string(),
            ));
        }

        if self.one_time_accepted {
            return Err(AgentError::ActionNotSupported(
                "one-time invitation already accepted".to_string(),
            ));
        }

        if self.state != State::Null {
            return Err(self.invalid_state("accept"));
        }

        let invitation = match &self.invitation {
            Some(InvitationPayload::OutOfBand(invitation)) => invitation.clone(),
            _ => return Err(self.invalid_state("accept")),
        };

        let attached = invitation
            .request_attach
            .content_value("request~attach")
            .and_then(messages::decode_value)
            .map_err(|err| self.fail(err))?;

        let service = invitation
            .service
            .first()
            .cloned()
            .ok_or_else(|| AgentError::malformed("service", "invitation without service"))
            .map_err(|err| self.fail(err))?;

        let pairwise = caps.crypto.create_pairwise_did().await?;
        let their_did = invitation.public_did.clone().unwrap_or_default();

        self.peer = Some(Peer {
            did: their_did.clone(),
            label: invitation.label.clone().unwrap_or_default(),
            did_doc: DidDoc {
                context: CONTEXT.to_string(),
                id: their_did,
                service: vec![service],
                ..Default::default()
            },
        });
        self.pairwise = Some(pairwise);
        self.one_time_accepted = true;
        self.set_state(State::Completed);

        info!("[connection:{}] one-time invitation accepted", self.source_id);
        Ok(attached.message)
    }

    /// `update_state` polls the transport and applies at most one state changing message
    pub async fn update_state(&mut self, caps: &Capabilities) -> Result<State, AgentError> {
        self.ensure_active()?;

        let verkey = match &self.pairwise {
            Some(pairwise) => pairwise.verkey.clone(),
            None => return Ok(self.state),
        };

        inbound::poll_once(self, caps, &verkey).await?;
        Ok(self.state)
    }

    pub async fn update_state_with_message(
        &mut self,
        caps: &Capabilities,
        raw: &str,
    ) -> Result<State, AgentError> {
        self.ensure_active()?;
        inbound::apply_raw(self, caps, raw).await?;
        Ok(self.state)
    }

    /// `completed` returns the snapshot used by the credential and proof exchanges
    pub fn completed(&self) -> Result<CompletedConnection, AgentError> {
        if self.state != State::Completed {
            return Err(self.invalid_state("use the connection"));
        }

        let pairwise = self.pairwise()?;
        let peer = self
            .peer
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("peer is unknown".to_string()))?;

        Ok(CompletedConnection {
            protocol: self.protocol,
            my_did: pairwise.did.clone(),
            my_verkey: pairwise.verkey.clone(),
            their_did: peer.did.clone(),
            their_verkey: peer.verkey(),
            route: Route::from_did_doc(&peer.did_doc),
        })
    }

    pub fn get_invite_details(&self) -> Result<String, AgentError> {
        let invitation = self
            .invitation
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("connection has no invitation".to_string()))?;

        let protocol = match invitation {
            InvitationPayload::OutOfBand(_) => ProtocolVariant::Aries,
            InvitationPayload::Connection(_) => self.protocol,
        };

        messages::encode(protocol, &invitation.to_message(), &Addressing::default())
    }

    pub fn get_problem(&self) -> Option<String> {
        self.problem.clone()
    }

    pub fn is_one_time(&self) -> bool {
        self.one_time
    }

    pub async fn send_ping(
        &mut self,
        caps: &Capabilities,
        comment: Option<String>,
    ) -> Result<String, AgentError> {
        let channel = self.side_channel("send_ping")?;
        let ping = Ping {
            id: messages::new_id(),
            response_requested: true,
            comment,
            thread: None,
        };

        channel.send(caps, &AgentMessage::Ping(ping.clone())).await?;
        self.pending_messages.insert(ping.id.clone(), MessageKind::Ping);
        self.touch();
        Ok(ping.id)
    }

    pub async fn send_discovery_features(
        &mut self,
        caps: &Capabilities,
        query: Option<String>,
        comment: Option<String>,
    ) -> Result<String, AgentError> {
        let channel = self.side_channel("send_discovery_features")?;
        let query = Query {
            id: messages::new_id(),
            query: query.unwrap_or_else(|| "*".to_string()),
            comment,
        };

        channel.send(caps, &AgentMessage::Query(query.clone())).await?;
        self.pending_messages.insert(query.id.clone(), MessageKind::Query);
        self.touch();
        Ok(query.id)
    }

    /// `send_answer` replies to a received question, the response must be one of the valid
    /// responses of the question
    pub async fn send_answer(
        &mut self,
        caps: &Capabilities,
        raw_question: &str,
        response: &str,
    ) -> Result<(), AgentError> {
        let channel = self.side_channel("send_answer")?;
        let question: Question = match messages::decode(raw_question)?.message {
            AgentMessage::Question(question) => question,
            other => {
                return Err(AgentError::InvalidInput(format!(
                    "expected a question, got: {}",
                    other.kind()
                )))
            }
        };

        if !question.is_valid_response(response) {
            return Err(AgentError::InvalidInput(format!(
                "response is not one of the valid responses: {}",
                response
            )));
        }

        let response_sig = if question.signature_required {
            let data = [response.as_bytes(), question.nonce.as_bytes()].concat();
            let signature = caps.crypto.sign(&channel.my_verkey, &data).await?;
            Some(ConnectionSignature::new(&data, &signature, &channel.my_verkey))
        } else {
            None
        };

        let thid = question
            .thread
            .as_ref()
            .and_then(|thread| thread.thid.clone())
            .unwrap_or_else(|| question.id.clone());

        let answer = Answer {
            id: messages::new_id(),
            response: response.to_string(),
            response_sig,
            timing: None,
            thread: Thread::new(thid),
        };

        channel.send(caps, &AgentMessage::Answer(answer)).await?;
        self.touch();
        Ok(())
    }

    /// `send_reuse` asks the peer to reuse this connection for the given out-of-band invitation
    pub async fn send_reuse(
        &mut self,
        caps: &Capabilities,
        raw_invitation: &str,
    ) -> Result<String, AgentError> {
        let channel = self.side_channel("send_reuse")?;
        let invitation = match messages::decode(raw_invitation)?.message {
            AgentMessage::OutOfBandInvitation(invitation) => invitation,
            other => {
                return Err(AgentError::InvalidInput(format!(
                    "expected an out-of-band invitation, got: {}",
                    other.kind()
                )))
            }
        };

        let id = messages::new_id();
        let reuse = HandshakeReuse {
            id: id.clone(),
            thread: Thread::new(id.clone()).with_pthid(Some(invitation.id)),
        };

        channel.send(caps, &AgentMessage::HandshakeReuse(reuse)).await?;
        self.pending_messages.insert(id.clone(), MessageKind::HandshakeReuse);
        self.touch();
        Ok(id)
    }

    pub async fn send_message(
        &mut self,
        caps: &Capabilities,
        content: &str,
    ) -> Result<String, AgentError> {
        let channel = self.side_channel("send_message")?;
        let message = BasicMessage {
            id: messages::new_id(),
            content: content.to_string(),
            sent_time: Utc::now().to_rfc3339(),
            thread: None,
        };

        channel
            .send(caps, &AgentMessage::BasicMessage(message.clone()))
            .await?;
        self.touch();
        Ok(message.id)
    }

    fn check_profile(caps: &Capabilities) -> Result<(), AgentError> {
        if caps.profile.endpoint.is_empty() {
            return Err(AgentError::InvalidInput(
                "agent endpoint is not configured".to_string(),
            ));
        }

        Ok(())
    }

    fn side_channel(&self, action: &str) -> Result<CompletedConnection, AgentError> {
        self.ensure_active()?;
        self.protocol.require_aries(action)?;
        self.completed()
    }

    fn pairwise(&self) -> Result<&PairwiseInfo, AgentError> {
        self.pairwise
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("pairwise DID is not created".to_string()))
    }

    fn my_did_doc(&self, caps: &Capabilities) -> Result<DidDoc, AgentError> {
        let pairwise = self.pairwise()?;
        Ok(DidDoc::new(
            &pairwise.did,
            &pairwise.verkey,
            &caps.profile.endpoint,
            caps.profile.routing_keys.clone(),
        ))
    }

    fn addressing(&self) -> Addressing {
        Addressing {
            from_did: self
                .pairwise
                .as_ref()
                .map(|pairwise| pairwise.did.clone())
                .unwrap_or_default(),
            to_did: self
                .peer
                .as_ref()
                .map(|peer| peer.did.clone())
                .unwrap_or_default(),
        }
    }

    fn invitation_route(&self) -> Result<Route, AgentError> {
        self.invitation
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("connection has no invitation".to_string()))?
            .route()
    }

    fn set_state(&mut self, state: State) {
        debug!(
            "[connection:{}] {:?} -> {:?}",
            self.source_id, self.state, state
        );
        self.state = state;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// `fail` moves the connection into its terminal `Error` state
    fn fail(&mut self, err: AgentError) -> AgentError {
        warn!("[connection:{}] failed: {}", self.source_id, err);
        self.problem = Some(err.to_string());
        self.set_state(State::Error);
        err
    }

    fn ensure_active(&self) -> Result<(), AgentError> {
        if self.state == State::Error {
            return Err(AgentError::InvalidState(format!(
                "connection {} is in error state",
                self.source_id
            )));
        }

        Ok(())
    }

    fn invalid_state(&self, action: &str) -> AgentError {
        AgentError::InvalidState(format!(
            "cannot {} a connection in state {:?}",
            action, self.state
        ))
    }

    fn in_handshake(&self) -> bool {
        matches!(
            self.state,
            State::Invited | State::Requested | State::Responded
        )
    }

    async fn send_request(&mut self, caps: &Capabilities) -> Result<(), AgentError> {
        let route = self.invitation_route()?;
        let pairwise = caps.crypto.create_pairwise_did().await?;
        self.pairwise = Some(pairwise.clone());

        let id = messages::new_id();
        let thread = match &self.invitation {
            Some(InvitationPayload::OutOfBand(invitation)) => {
                Some(Thread::new(id.clone()).with_pthid(Some(invitation.id.clone())))
            }
            _ => None,
        };

        let request = Request {
            id: id.clone(),
            label: caps.profile.label.clone(),
            connection: ConnectionData {
                did: pairwise.did.clone(),
                did_doc: self.my_did_doc(caps)?,
            },
            thread,
        };

        deliver(
            caps,
            self.protocol,
            &self.addressing(),
            &pairwise.verkey,
            &route,
            &AgentMessage::ConnectionRequest(request),
        )
        .await?;

        self.handshake_thread = Some(id);
        self.set_state(State::Requested);
        Ok(())
    }

    async fn handle_request(
        &mut self,
        caps: &Capabilities,
        request: Request,
    ) -> Result<Applied, AgentError> {
        if request.connection.did.is_empty() {
            return Err(self.fail(AgentError::malformed("connection.DID", "empty DID")));
        }

        request
            .connection
            .did_doc
            .validate()
            .map_err(|err| self.fail(err))?;

        let peer = Peer {
            did: request.connection.did.clone(),
            label: request.label.clone(),
            did_doc: request.connection.did_doc.clone(),
        };

        let pairwise = self.pairwise()?.clone();
        let data = ConnectionData {
            did: pairwise.did.clone(),
            did_doc: self.my_did_doc(caps)?,
        };

        let timestamp = Utc::now().timestamp().max(0) as u64;
        let sig_data = ConnectionSignature::sig_data_bytes(&data, timestamp)?;
        let signature = caps.crypto.sign(&pairwise.verkey, &sig_data).await?;

        let request_thread = request.thread.clone().unwrap_or_default();
        let thid = request_thread.thid.clone().unwrap_or_else(|| request.id.clone());
        let response = Response {
            id: messages::new_id(),
            thread: Thread::new(thid.clone()).with_pthid(request_thread.pthid),
            connection_sig: ConnectionSignature::new(&sig_data, &signature, &pairwise.verkey),
        };

        let addressing = Addressing {
            from_did: pairwise.did.clone(),
            to_did: peer.did.clone(),
        };

        deliver(
            caps,
            self.protocol,
            &addressing,
            &pairwise.verkey,
            &Route::from_did_doc(&peer.did_doc),
            &AgentMessage::ConnectionResponse(response),
        )
        .await?;

        self.peer = Some(peer);
        self.handshake_thread = Some(thid);
        self.set_state(State::Responded);
        Ok(Applied::transition())
    }

    async fn handle_response(
        &mut self,
        caps: &Capabilities,
        response: Response,
    ) -> Result<Applied, AgentError> {
        let sig = &response.connection_sig;
        let route = self.invitation_route()?;

        if !route.recipient_keys.contains(&sig.signer) {
            return Err(self.fail(AgentError::VerificationFailed(format!(
                "response signed by an unexpected key: {}",
                sig.signer
            ))));
        }

        let sig_data = sig.sig_data_raw().map_err(|err| self.fail(err))?;
        let signature = sig.signature_raw().map_err(|err| self.fail(err))?;
        let valid = caps.crypto.verify(&sig.signer, &sig_data, &signature).await?;
        if !valid {
            return Err(self.fail(AgentError::VerificationFailed(
                "invalid connection response signature".to_string(),
            )));
        }

        let data = sig.decode_connection().map_err(|err| self.fail(err))?;
        data.did_doc.validate().map_err(|err| self.fail(err))?;

        let label = match &self.invitation {
            Some(InvitationPayload::Connection(invitation)) => invitation.label.clone(),
            Some(InvitationPayload::OutOfBand(invitation)) => {
                invitation.label.clone().unwrap_or_default()
            }
            None => String::new(),
        };

        let peer = Peer {
            did: data.did,
            label,
            did_doc: data.did_doc,
        };

        let pairwise = self.pairwise()?.clone();
        let ack = Ack {
            id: messages::new_id(),
            status: AckStatus::Ok,
            thread: Thread::new(self.handshake_thread.clone().unwrap_or_default()),
        };

        let addressing = Addressing {
            from_did: pairwise.did.clone(),
            to_did: peer.did.clone(),
        };

        deliver(
            caps,
            self.protocol,
            &addressing,
            &pairwise.verkey,
            &Route::from_did_doc(&peer.did_doc),
            &AgentMessage::Ack(ack),
        )
        .await?;

        self.peer = Some(peer);
        self.set_state(State::Completed);
        info!("[connection:{}] completed", self.source_id);
        Ok(Applied::transition())
    }

    fn handle_problem_report(&mut self, report: ProblemReport) -> Applied {
        let reason = report.reason();
        warn!(
            "[connection:{}] problem report received: {}",
            self.source_id, reason
        );

        self.problem = Some(reason);
        self.set_state(State::Error);
        Applied::transition()
    }

    fn clear_pending(&mut self, thread: &Thread) {
        if let Some(thid) = &thread.thid {
            if self.pending_messages.remove(thid).is_some() {
                self.touch();
            }
        }
    }

    async fn handle_completed(
        &mut self,
        caps: &Capabilities,
        message: AgentMessage,
    ) -> Result<Applied, AgentError> {
        let channel = self.completed()?;
        let aries = self.protocol == ProtocolVariant::Aries;

        match message {
            AgentMessage::Ping(ping) => {
                if ping.response_requested && aries {
                    let thid = ping
                        .thread
                        .as_ref()
                        .and_then(|thread| thread.thid.clone())
                        .unwrap_or_else(|| ping.id.clone());

                    let response = PingResponse {
                        id: messages::new_id(),
                        comment: None,
                        thread: Thread::new(thid),
                    };
                    channel
                        .send(caps, &AgentMessage::PingResponse(response))
                        .await?;
                }

                Ok(Applied::handled())
            }
            AgentMessage::PingResponse(response) => {
                self.clear_pending(&response.thread);
                Ok(Applied::handled())
            }
            AgentMessage::Query(query) => {
                if aries {
                    let disclose = Disclose {
                        id: messages::new_id(),
                        protocols: supported_protocols(&query.query)
                            .into_iter()
                            .map(|pid| ProtocolDescriptor { pid, roles: None })
                            .collect(),
                        thread: Thread::new(query.id.clone()),
                    };
                    channel.send(caps, &AgentMessage::Disclose(disclose)).await?;
                }

                Ok(Applied::handled())
            }
            AgentMessage::Disclose(disclose) => {
                self.remote_protocols = disclose.protocols;
                self.clear_pending(&disclose.thread);
                Ok(Applied::handled())
            }
            AgentMessage::HandshakeReuse(reuse) => {
                if aries {
                    let accepted = HandshakeReuseAccepted {
                        id: messages::new_id(),
                        thread: Thread::new(reuse.id.clone()).with_pthid(reuse.thread.pthid),
                    };
                    channel
                        .send(caps, &AgentMessage::HandshakeReuseAccepted(accepted))
                        .await?;
                }

                Ok(Applied::handled())
            }
            AgentMessage::HandshakeReuseAccepted(accepted) => {
                self.clear_pending(&accepted.thread);
                Ok(Applied::handled())
            }
            _ => Ok(Applied::ignored()),
        }
    }
}

#[async_trait]
impl MessageHandler for Connection {
    async fn apply(
        &mut self,
        caps: &Capabilities,
        message: AgentMessage,
    ) -> Result<Applied, AgentError> {
        debug!(
            "[connection:{}] applying {} in state {:?}",
            self.source_id,
            message.kind(),
            self.state
        );

        let handshake = self.handshake_thread.clone().unwrap_or_default();
        match (self.actor, self.state) {
            (Actor::Inviter, State::Invited) => match message {
                AgentMessage::ConnectionRequest(request) => self.handle_request(caps, request).await,
                _ => Ok(Applied::ignored()),
            },
            (Actor::Invitee, State::Requested) => match message {
                AgentMessage::ConnectionResponse(response) if response.thread.is_reply(&handshake) => {
                    self.handle_response(caps, response).await
                }
                AgentMessage::ProblemReport(report) if report.thread.is_reply(&handshake) => {
                    Ok(self.handle_problem_report(report))
                }
                _ => Ok(Applied::ignored()),
            },
            (Actor::Inviter, State::Responded) => match message {
                AgentMessage::Ack(ack) if ack.thread.is_reply(&handshake) => {
                    self.set_state(State::Completed);
                    info!("[connection:{}] completed", self.source_id);
                    Ok(Applied::transition())
                }
                AgentMessage::ProblemReport(report) if report.thread.is_reply(&handshake) => {
                    Ok(self.handle_problem_report(report))
                }
                other => {
                    // any other message proves the peer completed its side
                    self.set_state(State::Completed);
                    info!("[connection:{}] completed", self.source_id);

                    let applied = self.handle_completed(caps, other).await?;
                    Ok(Applied {
                        transitioned: true,
                        consumed: applied.consumed,
                    })
                }
            },
            (_, State::Completed) => self.handle_completed(caps, message).await,
            _ => Ok(Applied::ignored()),
        }
    }

    fn on_malformed(&mut self, err: &AgentError) {
        if self.in_handshake() {
            let _ = self.fail(err.clone());
        }
    }

    fn processed(&self) -> &ProcessedMessages {
        &self.processed
    }

    fn processed_mut(&mut self) -> &mut ProcessedMessages {
        &mut self.processed
    }
}

impl ToJSON for Connection {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl EntityAccessor for Connection {
    type State = State;

    fn get_source_id(&self) -> String {
        self.source_id.clone()
    }

    fn get_state(&self) -> State {
        self.state
    }

    fn get_protocol(&self) -> ProtocolVariant {
        self.protocol
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn is_failed(&self) -> bool {
        self.state == State::Error
    }
}

impl ConnectionEntityAccessor for Connection {
    fn get_actor(&self) -> Actor {
        self.actor
    }

    fn get_invitation(&self) -> Option<InvitationPayload> {
        self.invitation.clone()
    }

    fn get_my_did(&self) -> Option<String> {
        self.pairwise.as_ref().map(|pairwise| pairwise.did.clone())
    }

    fn get_my_verkey(&self) -> Option<String> {
        self.pairwise.as_ref().map(|pairwise| pairwise.verkey.clone())
    }

    fn get_their_did(&self) -> Option<String> {
        self.peer.as_ref().map(|peer| peer.did.clone())
    }

    fn get_their_verkey(&self) -> Option<String> {
        self.peer.as_ref().map(|peer| peer.verkey())
    }

    fn get_remote_protocols(&self) -> Vec<ProtocolDescriptor> {
        self.remote_protocols.clone()
    }

    fn get_pending_messages(&self) -> HashMap<String, MessageKind> {
        self.pending_messages.clone()
    }
}
