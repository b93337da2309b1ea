use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rstdev_domain::BaseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::capability::crypto::RevocationConfig;
use crate::capability::Capabilities;
use crate::connection::CompletedConnection;
use crate::inbound::{self, Applied, MessageHandler, ProcessedMessages};
use crate::ledger::CredentialDef;
use crate::messages::attachment::{Attachment, Attachments};
use crate::messages::issuance::{
    Credential, CredentialOffer, CredentialPreview, CredentialProposal, CredentialRequest,
};
use crate::messages::notification::ProblemReport;
use crate::messages::thread::Thread;
use crate::messages::{self, AgentMessage};
use crate::types::{AgentError, EntityAccessor, ProtocolVariant, ToJSON};

use super::types::{IssuerState, RevocationInfo};

/// `Issuer` offers and issues a single credential to a single holder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issuer {
    source_id: String,
    protocol: ProtocolVariant,
    state: IssuerState,
    cred_def_id: String,
    preview: CredentialPreview,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    revocation: Option<RevocationConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    connection: Option<CompletedConnection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    offer: Option<CredentialOffer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    proposal: Option<CredentialProposal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    request: Option<CredentialRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    revocation_info: Option<RevocationInfo>,

    #[serde(default)]
    processed: ProcessedMessages,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    problem: Option<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Issuer {
    /// `create` prepares a credential of `cred_def` with the given attribute values, the values
    /// must be a JSON object mapping each attribute name to its value
    pub fn create(
        source_id: &str,
        cred_def: &CredentialDef,
        values: &Value,
        comment: Option<String>,
        protocol: ProtocolVariant,
    ) -> Result<Self, AgentError> {
        let preview = CredentialPreview::from_values(values)?;
        if preview.attributes.is_empty() {
            return Err(AgentError::InvalidInput(
                "credential values are empty".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            source_id: source_id.to_string(),
            protocol,
            state: IssuerState::Initialized,
            cred_def_id: cred_def.get_cred_def_id(),
            preview,
            comment,
            revocation: cred_def.get_revocation(),
            connection: None,
            thread_id: None,
            offer: None,
            proposal: None,
            request: None,
            revocation_info: None,
            processed: ProcessedMessages::default(),
            problem: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// `send_offer` sends a new offer, it is legal from `Initialized` and from `ProposalReceived`
    /// where it answers the holder counter proposal on the same thread
    pub async fn send_offer(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
    ) -> Result<(), AgentError> {
        if !matches!(
            self.state,
            IssuerState::Initialized | IssuerState::ProposalReceived
        ) {
            return Err(self.invalid_state("send an offer"));
        }

        let libindy_offer = caps.crypto.create_credential_offer(&self.cred_def_id).await?;
        let id = messages::new_id();
        let thread_id = self.thread_id.clone().unwrap_or_else(|| id.clone());

        let offer = CredentialOffer {
            id,
            comment: self.comment.clone(),
            credential_preview: self.preview.clone(),
            offers_attach: Attachments::single(Attachment::from_json(
                "libindy-cred-offer-0",
                &libindy_offer,
            )),
            thread: Some(Thread::new(thread_id.clone())),
        };

        connection
            .send(caps, &AgentMessage::CredentialOffer(offer.clone()))
            .await?;

        self.offer = Some(offer);
        self.thread_id = Some(thread_id);
        self.connection = Some(connection.clone());
        self.set_state(IssuerState::OfferSent);
        Ok(())
    }

    /// `send_credential` issues the credential requested by the holder, it is only legal once the
    /// request was received
    pub async fn send_credential(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
    ) -> Result<(), AgentError> {
        if self.state != IssuerState::RequestReceived {
            return Err(self.invalid_state("send the credential"));
        }

        let request = self
            .request
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("credential request is missing".to_string()))?
            .requests_attach
            .content_value("requests~attach");
        let request = request.map_err(|err| self.fail(err))?;

        let offer = self
            .offer
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("credential offer is missing".to_string()))?
            .offers_attach
            .content_value("offers~attach")?;

        let issued = caps
            .crypto
            .create_credential(
                &offer,
                &request,
                &self.preview.to_values(),
                self.revocation.clone(),
            )
            .await?;

        let credential = Credential {
            id: messages::new_id(),
            comment: self.comment.clone(),
            credentials_attach: Attachments::single(Attachment::from_json(
                "libindy-cred-0",
                &issued.credential,
            )),
            thread: self.thread_id.clone().map(Thread::new),
        };

        connection
            .send(caps, &AgentMessage::Credential(credential))
            .await?;

        self.revocation_info = match (&self.revocation, issued.cred_rev_id) {
            (Some(config), Some(cred_rev_id)) => Some(RevocationInfo {
                rev_reg_id: config.rev_reg_id.clone(),
                cred_rev_id,
                tails_file: config.tails_file.clone(),
            }),
            _ => None,
        };

        self.connection = Some(connection.clone());
        match self.protocol {
            // the legacy family never acks a credential
            ProtocolVariant::Proprietary => self.set_state(IssuerState::Accepted),
            ProtocolVariant::Aries => self.set_state(IssuerState::Issued),
        }
        info!("[issuer:{}] credential issued", self.source_id);
        Ok(())
    }

    pub async fn update_state(&mut self, caps: &Capabilities) -> Result<IssuerState, AgentError> {
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
    ) -> Result<IssuerState, AgentError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        inbound::apply_raw(self, caps, raw).await?;
        Ok(self.state)
    }

    /// `get_credential_offer` returns the last offer sent, encoded for the protocol of the exchange
    pub fn get_credential_offer(&self) -> Result<String, AgentError> {
        let offer = self
            .offer
            .clone()
            .ok_or_else(|| AgentError::InvalidState("no offer was sent".to_string()))?;

        let addressing = self
            .connection
            .as_ref()
            .map(CompletedConnection::addressing)
            .unwrap_or_default();

        messages::encode(self.protocol, &AgentMessage::CredentialOffer(offer), &addressing)
    }

    pub fn get_proposal(&self) -> Option<CredentialProposal> {
        self.proposal.clone()
    }

    pub fn get_revocation_info(&self) -> Option<RevocationInfo> {
        self.revocation_info.clone()
    }

    pub fn get_cred_def_id(&self) -> String {
        self.cred_def_id.clone()
    }

    pub fn get_thread_id(&self) -> Option<String> {
        self.thread_id.clone()
    }

    pub fn get_problem(&self) -> Option<String> {
        self.problem.clone()
    }

    fn set_state(&mut self, state: IssuerState) {
        debug!("[issuer:{}] {:?} -> {:?}", self.source_id, self.state, state);
        self.state = state;
        self.updated_at = Utc::now();
    }

    fn fail(&mut self, err: AgentError) -> AgentError {
        warn!("[issuer:{}] failed: {}", self.source_id, err);
        self.problem = Some(err.to_string());
        self.set_state(IssuerState::Error);
        err
    }

    fn reject(&mut self, report: ProblemReport) -> Applied {
        let reason = report.reason();
        info!("[issuer:{}] rejected by the holder: {}", self.source_id, reason);
        self.problem = Some(reason);
        self.set_state(IssuerState::Rejected);
        Applied::transition()
    }

    fn invalid_state(&self, action: &str) -> AgentError {
        AgentError::InvalidState(format!(
            "cannot {} in state {:?}",
            action, self.state
        ))
    }
}

#[async_trait]
impl MessageHandler for Issuer {
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
            (IssuerState::OfferSent, AgentMessage::CredentialRequest(request)) => {
                self.request = Some(request);
                self.set_state(IssuerState::RequestReceived);
                Ok(Applied::transition())
            }
            (IssuerState::OfferSent, AgentMessage::CredentialProposal(proposal)) => {
                self.proposal = Some(proposal);
                self.set_state(IssuerState::ProposalReceived);
                Ok(Applied::transition())
            }
            (IssuerState::Issued, AgentMessage::Ack(_)) => {
                self.set_state(IssuerState::Accepted);
                info!("[issuer:{}] credential accepted", self.source_id);
                Ok(Applied::transition())
            }
            (IssuerState::OfferSent | IssuerState::Issued, AgentMessage::ProblemReport(report)) => {
                Ok(self.reject(report))
            }
            (_, other) => {
                debug!(
                    "[issuer:{}] ignoring {} in state {:?}",
                    self.source_id,
                    other.kind(),
                    self.state
                );
                Ok(Applied::ignored())
            }
        }
    }

    fn on_malformed(&mut self, err: &AgentError) {
        debug!("[issuer:{}] malformed message: {}", self.source_id, err);
    }

    fn processed(&self) -> &ProcessedMessages {
        &self.processed
    }

    fn processed_mut(&mut self) -> &mut ProcessedMessages {
        &mut self.processed
    }
}

impl ToJSON for Issuer {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl EntityAccessor for Issuer {
    type State = IssuerState;

    fn get_source_id(&self) -> String {
        self.source_id.clone()
    }

    fn get_state(&self) -> IssuerState {
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
        self.state == IssuerState::Error
    }
}
