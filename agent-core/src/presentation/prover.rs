use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rstdev_domain::BaseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::capability::Capabilities;
use crate::connection::CompletedConnection;
use crate::inbound::{self, Applied, MessageHandler, ProcessedMessages};
use crate::messages::attachment::{Attachment, Attachments};
use crate::messages::notification::{Description, ProblemReport};
use crate::messages::presentation::{
    Presentation, PresentationPreview, PresentationProposal, PresentationRequest,
};
use crate::messages::thread::Thread;
use crate::messages::{self, AgentMessage};
use crate::types::{AgentError, EntityAccessor, ProtocolVariant, ToJSON};

use super::types::{Identifiers, ProverState};

/// `Prover` answers a proof request with a presentation built from its own credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prover {
    source_id: String,
    protocol: ProtocolVariant,
    state: ProverState,

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
    processed: ProcessedMessages,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    problem: Option<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Prover {
    fn new(source_id: &str, protocol: ProtocolVariant, state: ProverState) -> Self {
        let now = Utc::now();
        Self {
            source_id: source_id.to_string(),
            protocol,
            state,
            connection: None,
            thread_id: None,
            proposal: None,
            request: None,
            presentation: None,
            processed: ProcessedMessages::default(),
            problem: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn create_with_request(source_id: &str, raw_request: &str) -> Result<Self, AgentError> {
        let decoded = messages::decode(raw_request)?;
        let request = match decoded.message {
            AgentMessage::PresentationRequest(request) => request,
            other => {
                return Err(AgentError::InvalidInput(format!(
                    "expected a presentation request, got: {}",
                    other.kind()
                )))
            }
        };

        // the attached request must be readable before accepting the exchange
        request
            .request_presentations_attach
            .content_value("request_presentations~attach")?;

        let mut prover = Self::new(source_id, decoded.protocol, ProverState::RequestReceived);
        prover.thread_id = Some(
            request
                .thread
                .as_ref()
                .and_then(|thread| thread.thid.clone())
                .unwrap_or_else(|| request.id.clone()),
        );
        prover.processed.remember(request.id.clone());
        prover.request = Some(request);
        Ok(prover)
    }

    /// `create_with_proposal` starts the exchange from the prover side
    pub fn create_with_proposal(
        source_id: &str,
        preview: PresentationPreview,
        comment: Option<String>,
    ) -> Result<Self, AgentError> {
        if preview.attributes.is_empty() && preview.predicates.is_empty() {
            return Err(AgentError::InvalidInput(
                "presentation proposal is empty".to_string(),
            ));
        }

        let mut prover = Self::new(source_id, ProtocolVariant::Aries, ProverState::Initial);
        prover.proposal = Some(PresentationProposal {
            id: messages::new_id(),
            comment,
            presentation_proposal: preview,
            thread: None,
        });
        Ok(prover)
    }

    pub async fn send_proposal(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
    ) -> Result<(), AgentError> {
        self.protocol.require_aries("send_proposal")?;
        if self.state != ProverState::Initial {
            return Err(self.invalid_state("send a proposal"));
        }

        let proposal = self
            .proposal
            .clone()
            .ok_or_else(|| AgentError::InvalidState("proposal is missing".to_string()))?;

        connection
            .send(caps, &AgentMessage::PresentationProposal(proposal.clone()))
            .await?;

        self.thread_id = Some(proposal.id);
        self.connection = Some(connection.clone());
        self.set_state(ProverState::ProposalSent);
        Ok(())
    }

    /// `retrieve_credentials` returns the wallet credentials matching each referent of the request
    pub async fn retrieve_credentials(&self, caps: &Capabilities) -> Result<Value, AgentError> {
        if !matches!(self.state, ProverState::RequestReceived | ProverState::Generated) {
            return Err(self.invalid_state("retrieve credentials"));
        }

        let proof_request = self.proof_request()?;
        caps.crypto
            .search_credentials_for_request(&proof_request)
            .await
    }

    /// `generate_presentation` builds the proof from the selected credentials, it can be called
    /// again until the presentation is sent
    pub async fn generate_presentation(
        &mut self,
        caps: &Capabilities,
        selected_credentials: &Value,
        self_attested_attrs: &Value,
    ) -> Result<(), AgentError> {
        if !matches!(self.state, ProverState::RequestReceived | ProverState::Generated) {
            return Err(self.invalid_state("generate the presentation"));
        }

        let proof_request = self.proof_request()?;
        let identifiers = Identifiers::from_selected_credentials(selected_credentials)?;
        let (schemas, cred_defs) = identifiers.resolve(caps).await?;

        let self_attested = match self_attested_attrs {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };

        let proof = caps
            .crypto
            .create_proof(
                &proof_request,
                selected_credentials,
                &self_attested,
                &schemas,
                &cred_defs,
            )
            .await?;

        self.presentation = Some(Presentation {
            id: messages::new_id(),
            comment: None,
            presentations_attach: Attachments::single(Attachment::from_json(
                "libindy-presentation-0",
                &proof,
            )),
            thread: self.thread_id.clone().map(Thread::new),
        });
        self.set_state(ProverState::Generated);
        Ok(())
    }

    pub async fn send_presentation(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
    ) -> Result<(), AgentError> {
        if self.state != ProverState::Generated {
            return Err(self.invalid_state("send the presentation"));
        }

        let presentation = self
            .presentation
            .clone()
            .ok_or_else(|| AgentError::InvalidState("presentation is missing".to_string()))?;

        connection
            .send(caps, &AgentMessage::Presentation(presentation))
            .await?;

        self.connection = Some(connection.clone());
        match self.protocol {
            // the legacy family never acks a presentation
            ProtocolVariant::Proprietary => self.set_state(ProverState::Accepted),
            ProtocolVariant::Aries => self.set_state(ProverState::Sent),
        }
        info!("[prover:{}] presentation sent", self.source_id);
        Ok(())
    }

    /// `decline_request` refuses the proof request, a counter proposal asks the verifier for a new
    /// request otherwise the exchange is rejected
    pub async fn decline_request(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
        reason: Option<String>,
        counter_proposal: Option<PresentationPreview>,
    ) -> Result<(), AgentError> {
        self.protocol.require_aries("decline_request")?;
        if !matches!(self.state, ProverState::RequestReceived | ProverState::Generated) {
            return Err(self.invalid_state("decline the request"));
        }

        let preview = match counter_proposal {
            Some(preview) => preview,
            None => return self.reject(caps, connection, reason).await,
        };

        let proposal = PresentationProposal {
            id: messages::new_id(),
            comment: reason,
            presentation_proposal: preview,
            thread: self.thread_id.clone().map(Thread::new),
        };

        connection
            .send(caps, &AgentMessage::PresentationProposal(proposal.clone()))
            .await?;

        self.proposal = Some(proposal);
        self.presentation = None;
        self.connection = Some(connection.clone());
        self.set_state(ProverState::ProposalSent);
        Ok(())
    }

    /// `reject` terminates the exchange with a problem report
    pub async fn reject(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
        reason: Option<String>,
    ) -> Result<(), AgentError> {
        if self.state.is_terminal() || self.state == ProverState::Initial {
            return Err(self.invalid_state("reject the exchange"));
        }

        let thread_id = self
            .thread_id
            .clone()
            .ok_or_else(|| AgentError::InvalidState("exchange thread is unknown".to_string()))?;

        let report = ProblemReport {
            id: messages::new_id(),
            thread: Thread::new(thread_id),
            description: Some(Description {
                code: "request-rejected".to_string(),
                en: reason.clone(),
            }),
            comment: reason.clone(),
        };

        connection
            .send(caps, &AgentMessage::ProblemReport(report))
            .await?;

        self.problem = reason;
        self.connection = Some(connection.clone());
        self.set_state(ProverState::Rejected);
        Ok(())
    }

    pub async fn update_state(&mut self, caps: &Capabilities) -> Result<ProverState, AgentError> {
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
    ) -> Result<ProverState, AgentError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        inbound::apply_raw(self, caps, raw).await?;
        Ok(self.state)
    }

    pub fn get_presentation(&self) -> Result<Value, AgentError> {
        self.presentation
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("presentation is not generated".to_string()))?
            .presentations_attach
            .content_value("presentations~attach")
    }

    pub fn get_request(&self) -> Result<Value, AgentError> {
        self.proof_request()
    }

    pub fn get_thread_id(&self) -> Option<String> {
        self.thread_id.clone()
    }

    pub fn get_problem(&self) -> Option<String> {
        self.problem.clone()
    }

    fn proof_request(&self) -> Result<Value, AgentError> {
        self.request
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("no proof request was received".to_string()))?
            .request_presentations_attach
            .content_value("request_presentations~attach")
    }

    fn set_state(&mut self, state: ProverState) {
        debug!("[prover:{}] {:?} -> {:?}", self.source_id, self.state, state);
        self.state = state;
        self.updated_at = Utc::now();
    }

    fn invalid_state(&self, action: &str) -> AgentError {
        AgentError::InvalidState(format!(
            "cannot {} in state {:?}",
            action, self.state
        ))
    }
}

#[async_trait]
impl MessageHandler for Prover {
    async fn apply(
        &mut self,
        _caps: &Capabilities,
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
            (ProverState::ProposalSent, AgentMessage::PresentationRequest(request)) => {
                if let Err(err) = request
                    .request_presentations_attach
                    .content_value("request_presentations~attach")
                {
                    warn!("[prover:{}] unreadable proof request: {}", self.source_id, err);
                    self.problem = Some(err.to_string());
                    self.set_state(ProverState::Error);
                    return Err(err);
                }

                self.request = Some(request);
                self.set_state(ProverState::RequestReceived);
                Ok(Applied::transition())
            }
            (ProverState::Sent, AgentMessage::Ack(_)) => {
                self.set_state(ProverState::Accepted);
                info!("[prover:{}] presentation accepted", self.source_id);
                Ok(Applied::transition())
            }
            (ProverState::ProposalSent | ProverState::Sent, AgentMessage::ProblemReport(report)) => {
                let reason = report.reason();
                info!("[prover:{}] rejected by the verifier: {}", self.source_id, reason);
                self.problem = Some(reason);
                self.set_state(ProverState::Rejected);
                Ok(Applied::transition())
            }
            (_, other) => {
                debug!(
                    "[prover:{}] ignoring {} in state {:?}",
                    self.source_id,
                    other.kind(),
                    self.state
                );
                Ok(Applied::ignored())
            }
        }
    }

    fn on_malformed(&mut self, err: &AgentError) {
        debug!("[prover:{}] malformed message: {}", self.source_id, err);
    }

    fn processed(&self) -> &ProcessedMessages {
        &self.processed
    }

    fn processed_mut(&mut self) -> &mut ProcessedMessages {
        &mut self.processed
    }
}

impl ToJSON for Prover {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl EntityAccessor for Prover {
    type State = ProverState;

    fn get_source_id(&self) -> String {
        self.source_id.clone()
    }

    fn get_state(&self) -> ProverState {
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
        self.state == ProverState::Error
    }
}
