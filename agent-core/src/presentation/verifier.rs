use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rstdev_domain::BaseError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::capability::Capabilities;
use crate::connection::CompletedConnection;
use crate::inbound::{self, Applied, MessageHandler, ProcessedMessages};
use crate::messages::attachment::{Attachment, Attachments};
use crate::messages::notification::{Ack, AckStatus};
use crate::messages::presentation::{Presentation, PresentationProposal, PresentationRequest};
use crate::messages::thread::Thread;
use crate::messages::{self, AgentMessage};
use crate::types::{AgentError, EntityAccessor, ProtocolVariant, ToJSON};

use super::types::{Identifiers, VerificationResult, VerifierState};

const PROOF_REQUEST_VERSION: &str = "1.0";

/// `Verifier` requests a proof and verifies the received presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verifier {
    source_id: String,
    protocol: ProtocolVariant,
    state: VerifierState,
    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    proof_request: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    connection: Option<CompletedConnection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    proposal: Option<PresentationProposal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    request: Option<PresentationRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    presentation: Option<Presentation>,

    #[serde(default)]
    verification_result: VerificationResult,

    #[serde(default)]
    processed: ProcessedMessages,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    problem: Option<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Verifier {
    fn new(source_id: &str, name: &str, protocol: ProtocolVariant, state: VerifierState) -> Self {
        let now = Utc::now();
        Self {
            source_id: source_id.to_string(),
            protocol,
            state,
            name: name.to_string(),
            proof_request: None,
            connection: None,
            thread_id: None,
            proposal: None,
            request: None,
            presentation: None,
            verification_result: VerificationResult::Undefined,
            processed: ProcessedMessages::default(),
            problem: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `create` builds the proof request
    ///
    /// `requested_attrs` and `requested_predicates` are JSON arrays, each attribute must have a
    /// `name` or a `names` field, each predicate a `name`, `p_type` and `p_value`. The revocation
    /// interval is ignored when it is not an object with at least one bound
    pub async fn create(
        caps: &Capabilities,
        source_id: &str,
        requested_attrs: &Value,
        requested_predicates: &Value,
        revocation_interval: &Value,
        name: &str,
        protocol: ProtocolVariant,
    ) -> Result<Self, AgentError> {
        let attributes = referents(requested_attrs, "attribute", |attr| {
            attr.get("name").is_some() || attr.get("names").is_some()
        })?;

        let predicates = referents(requested_predicates, "predicate", |predicate| {
            ["name", "p_type", "p_value"]
                .iter()
                .all(|field| predicate.get(*field).is_some())
        })?;

        if attributes.is_empty() && predicates.is_empty() {
            return Err(AgentError::InvalidInput(
                "proof request without any attribute or predicate".to_string(),
            ));
        }

        let nonce = caps.crypto.generate_nonce().await?;
        let mut proof_request = json!({
            "nonce": nonce,
            "name": name,
            "version": PROOF_REQUEST_VERSION,
            "requested_attributes": attributes,
            "requested_predicates": predicates,
        });

        let bounded = revocation_interval
            .as_object()
            .map(|interval| interval.values().any(|bound| !bound.is_null()))
            .unwrap_or(false);
        if bounded {
            proof_request["non_revoked"] = revocation_interval.clone();
        }

        let mut verifier = Self::new(source_id, name, protocol, VerifierState::Initial);
        verifier.proof_request = Some(proof_request);
        Ok(verifier)
    }

    /// `create_with_proposal` starts the exchange from a presentation proposal received from the
    /// prover, the request is built later by [`Verifier::request_for_proposal`]
    pub fn create_with_proposal(
        source_id: &str,
        raw_proposal: &str,
        name: &str,
    ) -> Result<Self, AgentError> {
        let decoded = messages::decode(raw_proposal)?;
        let proposal = match decoded.message {
            AgentMessage::PresentationProposal(proposal) => proposal,
            other => {
                return Err(AgentError::InvalidInput(format!(
                    "expected a presentation proposal, got: {}",
                    other.kind()
                )))
            }
        };

        let mut verifier = Self::new(
            source_id,
            name,
            decoded.protocol,
            VerifierState::ProposalReceived,
        );
        verifier.thread_id = Some(
            proposal
                .thread
                .as_ref()
                .and_then(|thread| thread.thid.clone())
                .unwrap_or_else(|| proposal.id.clone()),
        );
        verifier.processed.remember(proposal.id.clone());
        verifier.proposal = Some(proposal);
        Ok(verifier)
    }

    pub async fn send_request(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
    ) -> Result<(), AgentError> {
        if self.state != VerifierState::Initial {
            return Err(self.invalid_state("send the proof request"));
        }

        let proof_request = self
            .proof_request
            .clone()
            .ok_or_else(|| AgentError::InvalidState("proof request is missing".to_string()))?;

        self.deliver_request(caps, connection, proof_request, None).await
    }

    /// `request_for_proposal` answers the proposal of the prover with a proof request asking for
    /// the proposed attributes and predicates
    pub async fn request_for_proposal(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
    ) -> Result<(), AgentError> {
        self.protocol.require_aries("request_for_proposal")?;
        if self.state != VerifierState::ProposalReceived {
            return Err(self.invalid_state("answer the proposal"));
        }

        let proposal = self
            .proposal
            .clone()
            .ok_or_else(|| AgentError::InvalidState("proposal is missing".to_string()))?;
        let preview = proposal.presentation_proposal;

        let attrs: Vec<Value> = preview
            .attributes
            .iter()
            .map(|attr| {
                let mut requested = json!({"name": attr.name});
                if let Some(cred_def_id) = &attr.cred_def_id {
                    requested["restrictions"] = json!([{"cred_def_id": cred_def_id}]);
                }
                requested
            })
            .collect();

        let predicates: Vec<Value> = preview
            .predicates
            .iter()
            .map(|predicate| {
                json!({
                    "name": predicate.name,
                    "p_type": predicate.predicate,
                    "p_value": predicate.threshold,
                    "restrictions": [{"cred_def_id": predicate.cred_def_id}],
                })
            })
            .collect();

        let nonce = caps.crypto.generate_nonce().await?;
        let proof_request = json!({
            "nonce": nonce,
            "name": self.name,
            "version": PROOF_REQUEST_VERSION,
            "requested_attributes": referents(&Value::Array(attrs), "attribute", |_| true)?,
            "requested_predicates": referents(&Value::Array(predicates), "predicate", |_| true)?,
        });

        let thread_id = self.thread_id.clone();
        self.deliver_request(caps, connection, proof_request, thread_id)
            .await
    }

    pub async fn update_state(&mut self, caps: &Capabilities) -> Result<VerifierState, AgentError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        let verkey = match &self.connection {
            Some(connection) => connection.my_verkey.clone(),
            None => return Ok(self.state),
        };

        inbound::poll_once(self, caps, &verkey).await?;
        Ok(self.state)
    }

    pub async fn update_state_with_message(
        &mut self,
        caps: &Capabilities,
        raw: &str,
    ) -> Result<VerifierState, AgentError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        inbound::apply_raw(self, caps, raw).await?;
        Ok(self.state)
    }

    /// `get_presentation` returns the received proof together with its verification result
    pub fn get_presentation(&self) -> Result<Value, AgentError> {
        if self.state != VerifierState::Verified {
            return Err(self.invalid_state("get the presentation"));
        }

        let proof = self
            .presentation
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("presentation is missing".to_string()))?
            .presentations_attach
            .content_value("presentations~attach")?;

        Ok(json!({
            "presentation": proof,
            "verification_result": self.verification_result,
        }))
    }

    pub fn get_verification_result(&self) -> VerificationResult {
        self.verification_result
    }

    /// `get_presentation_request` returns the proof request message, encoded for the protocol of
    /// the exchange
    pub fn get_presentation_request(&self) -> Result<String, AgentError> {
        let request = self
            .request
            .clone()
            .ok_or_else(|| AgentError::InvalidState("proof request was not sent".to_string()))?;

        let addressing = self
            .connection
            .as_ref()
            .map(CompletedConnection::addressing)
            .unwrap_or_default();

        messages::encode(
            self.protocol,
            &AgentMessage::PresentationRequest(request),
            &addressing,
        )
    }

    pub fn get_proposal(&self) -> Option<PresentationProposal> {
        self.proposal.clone()
    }

    pub fn get_thread_id(&self) -> Option<String> {
        self.thread_id.clone()
    }

    pub fn get_problem(&self) -> Option<String> {
        self.problem.clone()
    }

    async fn deliver_request(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
        proof_request: Value,
        thread_id: Option<String>,
    ) -> Result<(), AgentError> {
        let id = messages::new_id();
        let thread_id = thread_id.unwrap_or_else(|| id.clone());

        let request = PresentationRequest {
            id,
            comment: Some(self.name.clone()),
            request_presentations_attach: Attachments::single(Attachment::from_json(
                "libindy-request-presentation-0",
                &proof_request,
            )),
            thread: Some(Thread::new(thread_id.clone())),
        };

        connection
            .send(caps, &AgentMessage::PresentationRequest(request.clone()))
            .await?;

        self.proof_request = Some(proof_request);
        self.request = Some(request);
        self.thread_id = Some(thread_id);
        self.connection = Some(connection.clone());
        self.set_state(VerifierState::RequestSent);
        Ok(())
    }

    /// `verify` resolves every public object referenced by the presentation before delegating the
    /// verification, a presentation that cannot be fully resolved moves the verifier to `Error`
    async fn verify(
        &mut self,
        caps: &Capabilities,
        presentation: Presentation,
    ) -> Result<Applied, AgentError> {
        let previous = self.state;
        self.set_state(VerifierState::PresentationReceived);

        match self.verify_presentation(caps, presentation).await {
            Err(err) if !self.is_failed() => {
                self.set_state(previous);
                Err(err)
            }
            result => result,
        }
    }

    async fn verify_presentation(
        &mut self,
        caps: &Capabilities,
        presentation: Presentation,
    ) -> Result<Applied, AgentError> {
        let proof = presentation
            .presentations_attach
            .content_value("presentations~attach")
            .map_err(|err| self.fail(err))?;

        let identifiers = Identifiers::from_proof(&proof).map_err(|err| self.fail(err))?;
        let (schemas, cred_defs) = match identifiers.resolve(caps).await {
            Ok(resolved) => resolved,
            Err(err) => return Err(self.fail(err)),
        };

        let proof_request = self
            .proof_request
            .clone()
            .ok_or_else(|| AgentError::InvalidState("proof request is missing".to_string()))?;

        let valid = caps
            .crypto
            .verify_proof(&proof_request, &proof, &schemas, &cred_defs)
            .await?;

        if self.protocol == ProtocolVariant::Aries {
            let connection = self
                .connection
                .clone()
                .ok_or_else(|| AgentError::InvalidState("connection is missing".to_string()))?;

            let ack = Ack {
                id: messages::new_id(),
                status: if valid { AckStatus::Ok } else { AckStatus::Fail },
                thread: Thread::new(self.thread_id.clone().unwrap_or_default()),
            };
            connection.send(caps, &AgentMessage::Ack(ack)).await?;
        }

        self.verification_result = if valid {
            VerificationResult::Validated
        } else {
            VerificationResult::Invalid
        };
        self.presentation = Some(presentation);
        self.set_state(VerifierState::Verified);

        info!(
            "[verifier:{}] presentation verified: {:?}",
            self.source_id, self.verification_result
        );
        Ok(Applied::transition())
    }

    fn set_state(&mut self, state: VerifierState) {
        debug!("[verifier:{}] {:?} -> {:?}", self.source_id, self.state, state);
        self.state = state;
        self.updated_at = Utc::now();
    }

    fn fail(&mut self, err: AgentError) -> AgentError {
        warn!("[verifier:{}] failed: {}", self.source_id, err);
        self.problem = Some(err.to_string());
        self.set_state(VerifierState::Error);
        err
    }

    fn invalid_state(&self, action: &str) -> AgentError {
        AgentError::InvalidState(format!(
            "cannot {} in state {:?}",
            action, self.state
        ))
    }
}

/// `referents` turns a list of requested items into the object keyed by referent names
fn referents(
    items: &Value,
    prefix: &str,
    valid: impl Fn(&Value) -> bool,
) -> Result<Map<String, Value>, AgentError> {
    let items = match items {
        Value::Null => return Ok(Map::new()),
        Value::Array(items) => items,
        _ => {
            return Err(AgentError::InvalidInput(format!(
                "requested {}s must be a JSON array",
                prefix
            )))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            if !item.is_object() || !valid(item) {
                return Err(AgentError::InvalidInput(format!(
                    "invalid requested {}: {}",
                    prefix, item
                )));
            }

            Ok((format!("{}_{}", prefix, idx), item.clone()))
        })
        .collect()
}

#[async_trait]
impl MessageHandler for Verifier {
    async fn apply(
        &mut self,
        caps: &Capabilities,
        message: AgentMessage,
    ) -> Result<Applied, AgentError> {
        let thread_id = match &self.thread_id {
            Some(thread_id) => thread_id.clone(),
            None => return Ok(Applied::ignored()),
        };

        if !message.is_reply_to(&thread_id) {
            return Ok(Applied::ignored());
        }

        match (self.state, message) {
            (VerifierState::RequestSent, AgentMessage::Presentation(presentation)) => {
                self.verify(caps, presentation).await
            }
            (VerifierState::RequestSent, AgentMessage::PresentationProposal(proposal)) => {
                self.proposal = Some(proposal);
                self.set_state(VerifierState::ProposalReceived);
                Ok(Applied::transition())
            }
            (VerifierState::RequestSent, AgentMessage::ProblemReport(report)) => {
                let reason = report.reason();
                info!("[verifier:{}] rejected by the prover: {}", self.source_id, reason);
                self.problem = Some(reason);
                self.set_state(VerifierState::Rejected);
                Ok(Applied::transition())
            }
            (_, other) => {
                debug!(
                    "[verifier:{}] ignoring {} in state {:?}",
                    self.source_id,
                    other.kind(),
                    self.state
                );
                Ok(Applied::ignored())
            }
        }
    }

    fn on_malformed(&mut self, err: &AgentError) {
        debug!("[verifier:{}] malformed message: {}", self.source_id, err);
    }

    fn processed(&self) -> &ProcessedMessages {
        &self.processed
    }

    fn processed_mut(&mut self) -> &mut ProcessedMessages {
        &mut self.processed
    }
}

impl ToJSON for Verifier {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl EntityAccessor for Verifier {
    type State = VerifierState;

    fn get_source_id(&self) -> String {
        self.source_id.clone()
    }

    fn get_state(&self) -> VerifierState {
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
        self.state == VerifierState::Error
    }
}
