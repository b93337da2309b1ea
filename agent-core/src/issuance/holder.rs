use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rstdev_domain::BaseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::capability::wallet::{RecordOptions, RECORD_TYPE_CREDENTIAL};
use crate::capability::{Capabilities, ResourceKind};
use crate::connection::CompletedConnection;
use crate::inbound::{self, Applied, MessageHandler, ProcessedMessages};
use crate::messages::attachment::{Attachment, Attachments};
use crate::messages::issuance::{Credential, CredentialOffer, CredentialPreview, CredentialProposal, CredentialRequest};
use crate::messages::notification::{Ack, AckStatus, Description, ProblemReport};
use crate::messages::thread::Thread;
use crate::messages::{self, AgentMessage};
use crate::types::{AgentError, EntityAccessor, ProtocolVariant, ToJSON, WalletError};

use super::types::HolderState;

/// `Holder` receives a credential offer, requests the credential and stores it
///
/// Storing the credential is idempotent: the wallet record is keyed by the `@id` of the
/// credential message, a replayed message never creates a second record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holder {
    source_id: String,
    protocol: ProtocolVariant,
    state: HolderState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    connection: Option<CompletedConnection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    proposal: Option<CredentialProposal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    offer: Option<CredentialOffer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    request: Option<CredentialRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_metadata: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    credential: Option<Credential>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    credential_id: Option<String>,

    #[serde(default)]
    processed: ProcessedMessages,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    problem: Option<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Holder {
    fn new(source_id: &str, protocol: ProtocolVariant, state: HolderState) -> Self {
        let now = Utc::now();
        Self {
            source_id: source_id.to_string(),
            protocol,
            state,
            connection: None,
            thread_id: None,
            proposal: None,
            offer: None,
            request: None,
            request_metadata: None,
            credential: None,
            credential_id: None,
            processed: ProcessedMessages::default(),
            problem: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `create_with_offer` starts the exchange from an offer received out of the state machine,
    /// the protocol of the exchange is the one of the offer
    pub fn create_with_offer(source_id: &str, raw_offer: &str) -> Result<Self, AgentError> {
        let decoded = messages::decode(raw_offer)?;
        let offer = match decoded.message {
            AgentMessage::CredentialOffer(offer) => offer,
            other => {
                return Err(AgentError::InvalidInput(format!(
                    "expected a credential offer, got: {}",
                    other.kind()
                )))
            }
        };

        let mut holder = Self::new(source_id, decoded.protocol, HolderState::OfferReceived);
        holder.thread_id = Some(
            offer
                .thread
                .as_ref()
                .and_then(|thread| thread.thid.clone())
                .unwrap_or_else(|| offer.id.clone()),
        );
        holder.processed.remember(offer.id.clone());
        holder.offer = Some(offer);
        Ok(holder)
    }

    /// `create_with_proposal` starts the exchange from the holder side
    pub fn create_with_proposal(
        source_id: &str,
        schema_id: &str,
        cred_def_id: &str,
        values: &Value,
        comment: Option<String>,
    ) -> Result<Self, AgentError> {
        if cred_def_id.is_empty() {
            return Err(AgentError::InvalidInput(
                "empty credential definition id".to_string(),
            ));
        }

        let mut holder = Self::new(source_id, ProtocolVariant::Aries, HolderState::Initial);
        holder.proposal = Some(CredentialProposal {
            id: messages::new_id(),
            comment,
            credential_proposal: CredentialPreview::from_values(values)?,
            schema_id: schema_id.to_string(),
            cred_def_id: cred_def_id.to_string(),
            thread: None,
        });
        Ok(holder)
    }

    pub async fn send_proposal(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
    ) -> Result<(), AgentError> {
        self.protocol.require_aries("send_proposal")?;
        if self.state != HolderState::Initial {
            return Err(self.invalid_state("send a proposal"));
        }

        let proposal = self
            .proposal
            .clone()
            .ok_or_else(|| AgentError::InvalidState("proposal is missing".to_string()))?;

        connection
            .send(caps, &AgentMessage::CredentialProposal(proposal.clone()))
            .await?;

        self.thread_id = Some(proposal.id);
        self.connection = Some(connection.clone());
        self.set_state(HolderState::ProposalSent);
        Ok(())
    }

    /// `send_request` accepts the offer and requests the credential
    pub async fn send_request(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
    ) -> Result<(), AgentError> {
        if self.state != HolderState::OfferReceived {
            return Err(self.invalid_state("send a request"));
        }

        let offer = self
            .offer
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("credential offer is missing".to_string()))?;

        let libindy_offer = offer.offers_attach.content_value("offers~attach");
        let libindy_offer = libindy_offer.map_err(|err| self.fail(err))?;
        let cred_def_id = self.cred_def_id().map_err(|err| self.fail(err))?;

        let cred_def = caps
            .ledger
            .resolve(ResourceKind::CredentialDefinition, &cred_def_id, &caps.cache)
            .await?;

        let request_data = caps
            .crypto
            .create_credential_request(&connection.my_did, &libindy_offer, &cred_def)
            .await?;

        let request = CredentialRequest {
            id: messages::new_id(),
            comment: None,
            requests_attach: Attachments::single(Attachment::from_json(
                "libindy-cred-request-0",
                &request_data.request,
            )),
            thread: self.thread_id.clone().map(Thread::new),
        };

        connection
            .send(caps, &AgentMessage::CredentialRequest(request.clone()))
            .await?;

        self.request = Some(request);
        self.request_metadata = Some(request_data.metadata);
        self.connection = Some(connection.clone());
        self.set_state(HolderState::RequestSent);
        Ok(())
    }

    /// `decline` refuses the offer, a counter proposal keeps the exchange alive otherwise the
    /// exchange is rejected
    pub async fn decline(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
        comment: Option<String>,
        counter_proposal: Option<Value>,
    ) -> Result<(), AgentError> {
        self.protocol.require_aries("decline")?;
        if self.state != HolderState::OfferReceived {
            return Err(self.invalid_state("decline the offer"));
        }

        let values = match counter_proposal {
            Some(values) => values,
            None => return self.reject(caps, connection, comment).await,
        };

        let cred_def_id = self.cred_def_id()?;
        let proposal = CredentialProposal {
            id: messages::new_id(),
            comment,
            credential_proposal: CredentialPreview::from_values(&values)?,
            schema_id: self.schema_id().unwrap_or_default(),
            cred_def_id,
            thread: self.thread_id.clone().map(Thread::new),
        };

        connection
            .send(caps, &AgentMessage::CredentialProposal(proposal.clone()))
            .await?;

        self.proposal = Some(proposal);
        self.connection = Some(connection.clone());
        self.set_state(HolderState::ProposalSent);
        Ok(())
    }

    /// `reject` sends a problem report on the exchange thread, the exchange is terminated
    pub async fn reject(
        &mut self,
        caps: &Capabilities,
        connection: &CompletedConnection,
        comment: Option<String>,
    ) -> Result<(), AgentError> {
        if self.state.is_terminal() || self.state == HolderState::Initial {
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
                code: "credential-rejected".to_string(),
                en: comment.clone(),
            }),
            comment: comment.clone(),
        };

        connection
            .send(caps, &AgentMessage::ProblemReport(report))
            .await?;

        self.problem = comment;
        self.connection = Some(connection.clone());
        self.set_state(HolderState::Rejected);
        Ok(())
    }

    pub async fn update_state(&mut self, caps: &Capabilities) -> Result<HolderState, AgentError> {
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
    ) -> Result<HolderState, AgentError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        inbound::apply_raw(self, caps, raw).await?;
        Ok(self.state)
    }

    pub fn get_offer(&self) -> Result<String, AgentError> {
        let offer = self
            .offer
            .clone()
            .ok_or_else(|| AgentError::InvalidState("no offer was received".to_string()))?;

        messages::encode(
            self.protocol,
            &AgentMessage::CredentialOffer(offer),
            &self.addressing(),
        )
    }

    /// `get_credential` returns the raw credential received from the issuer
    pub fn get_credential(&self) -> Result<Value, AgentError> {
        if self.state != HolderState::Accepted {
            return Err(self.invalid_state("get the credential"));
        }

        self.credential
            .as_ref()
            .ok_or_else(|| AgentError::InvalidState("credential is missing".to_string()))?
            .credentials_attach
            .content_value("credentials~attach")
    }

    /// `get_attributes` returns the attribute values of the offered credential
    pub fn get_attributes(&self) -> Result<Value, AgentError> {
        self.offer
            .as_ref()
            .map(|offer| offer.credential_preview.to_values())
            .ok_or_else(|| AgentError::InvalidState("no offer was received".to_string()))
    }

    pub fn get_credential_id(&self) -> Option<String> {
        self.credential_id.clone()
    }

    pub fn get_thread_id(&self) -> Option<String> {
        self.thread_id.clone()
    }

    pub fn get_problem(&self) -> Option<String> {
        self.problem.clone()
    }

    fn cred_def_id(&self) -> Result<String, AgentError> {
        match &self.offer {
            Some(offer) => offer.cred_def_id(),
            None => self
                .proposal
                .as_ref()
                .map(|proposal| proposal.cred_def_id.clone())
                .ok_or_else(|| AgentError::InvalidState("no offer was received".to_string())),
        }
    }

    fn schema_id(&self) -> Option<String> {
        let offer = self.offer.as_ref()?.offers_attach.content_value("offers~attach").ok()?;
        offer
            .get("schema_id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn addressing(&self) -> messages::Addressing {
        self.connection
            .as_ref()
            .map(CompletedConnection::addressing)
            .unwrap_or_default()
    }

    fn set_state(&mut self, state: HolderState) {
        debug!("[holder:{}] {:?} -> {:?}", self.source_id, self.state, state);
        self.state = state;
        self.updated_at = Utc::now();
    }

    fn fail(&mut self, err: AgentError) -> AgentError {
        warn!("[holder:{}] failed: {}", self.source_id, err);
        self.problem = Some(err.to_string());
        self.set_state(HolderState::Error);
        err
    }

    fn invalid_state(&self, action: &str) -> AgentError {
        AgentError::InvalidState(format!(
            "cannot {} in state {:?}",
            action, self.state
        ))
    }

    /// `store_credential` keeps the credential into the wallet, a record already stored under the
    /// same id is accepted as is
    async fn store_credential(
        &mut self,
        caps: &Capabilities,
        credential: &Credential,
    ) -> Result<String, AgentError> {
        let record_id = credential.id.clone();
        let options = RecordOptions::default();

        match caps
            .wallet
            .get(RECORD_TYPE_CREDENTIAL, &record_id, &options)
            .await
        {
            Ok(_) => {
                debug!(
                    "[holder:{}] credential {} already stored",
                    self.source_id, record_id
                );
                return Ok(record_id);
            }
            Err(WalletError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let raw = credential.credentials_attach.content_value("credentials~attach");
        let raw = raw.map_err(|err| self.fail(err))?;

        let cred_def_id = self.cred_def_id()?;
        let cred_def = caps
            .ledger
            .resolve(ResourceKind::CredentialDefinition, &cred_def_id, &caps.cache)
            .await?;

        let metadata = self.request_metadata.clone().unwrap_or(Value::Null);
        let processed = caps
            .crypto
            .process_credential(&raw, &metadata, &cred_def)
            .await?;

        let tags = HashMap::from([
            ("cred_def_id".to_string(), cred_def_id),
            ("thread_id".to_string(), self.thread_id.clone().unwrap_or_default()),
        ]);

        match caps
            .wallet
            .add(
                RECORD_TYPE_CREDENTIAL,
                &record_id,
                &processed.to_string(),
                Some(tags),
            )
            .await
        {
            Ok(()) | Err(WalletError::Duplicate(_)) => Ok(record_id),
            Err(err) => Err(err.into()),
        }
    }

    async fn accept_credential(
        &mut self,
        caps: &Capabilities,
        credential: Credential,
    ) -> Result<Applied, AgentError> {
        let record_id = self.store_credential(caps, &credential).await?;

        if self.protocol == ProtocolVariant::Aries {
            let connection = self
                .connection
                .clone()
                .ok_or_else(|| AgentError::InvalidState("connection is missing".to_string()))?;

            let ack = Ack {
                id: messages::new_id(),
                status: AckStatus::Ok,
                thread: Thread::new(self.thread_id.clone().unwrap_or_default()),
            };
            connection.send(caps, &AgentMessage::Ack(ack)).await?;
        }

        self.credential = Some(credential);
        self.credential_id = Some(record_id);
        self.set_state(HolderState::Accepted);
        info!("[holder:{}] credential stored", self.source_id);
        Ok(Applied::transition())
    }
}

#[async_trait]
impl MessageHandler for Holder {
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
            (HolderState::ProposalSent, AgentMessage::CredentialOffer(offer)) => {
                self.offer = Some(offer);
                self.set_state(HolderState::OfferReceived);
                Ok(Applied::transition())
            }
            (HolderState::RequestSent, AgentMessage::Credential(credential)) => {
                self.accept_credential(caps, credential).await
            }
            (
                HolderState::ProposalSent | HolderState::RequestSent,
                AgentMessage::ProblemReport(report),
            ) => {
                let reason = report.reason();
                info!("[holder:{}] rejected by the issuer: {}", self.source_id, reason);
                self.problem = Some(reason);
                self.set_state(HolderState::Rejected);
                Ok(Applied::transition())
            }
            (_, other) => {
                debug!(
                    "[holder:{}] ignoring {} in state {:?}",
                    self.source_id,
                    other.kind(),
                    self.state
                );
                Ok(Applied::ignored())
            }
        }
    }

    fn on_malformed(&mut self, err: &AgentError) {
        debug!("[holder:{}] malformed message: {}", self.source_id, err);
    }

    fn processed(&self) -> &ProcessedMessages {
        &self.processed
    }

    fn processed_mut(&mut self) -> &mut ProcessedMessages {
        &mut self.processed
    }
}

impl ToJSON for Holder {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl EntityAccessor for Holder {
    type State = HolderState;

    fn get_source_id(&self) -> String {
        self.source_id.clone()
    }

    fn get_state(&self) -> HolderState {
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
        self.state == HolderState::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use mockall::mock;
    use serde_json::json;

    use crate::capability::wallet::{WalletBuilder, WalletRecord};
    use crate::capability::TransportBuilder;
    use crate::issuance::{Issuer, IssuerState};
    use crate::ledger::CredentialDef;
    use crate::testing::{channel, party, FakeTransport, Party, CRED_DEF_ID, SCHEMA_ID};

    mock!(
        FakeWallet{}

        #[async_trait]
        impl WalletBuilder for FakeWallet {
            async fn add(
                &self,
                record_type: &str,
                id: &str,
                value: &str,
                tags: Option<HashMap<String, String>>,
            ) -> Result<(), WalletError>;

            async fn get(
                &self,
                record_type: &str,
                id: &str,
                options: &RecordOptions,
            ) -> Result<WalletRecord, WalletError>;

            async fn update_value(&self, record_type: &str, id: &str, value: &str)
                -> Result<(), WalletError>;

            async fn update_tags(
                &self,
                record_type: &str,
                id: &str,
                tags: HashMap<String, String>,
            ) -> Result<(), WalletError>;

            async fn delete(&self, record_type: &str, id: &str) -> Result<(), WalletError>;

            async fn open_search(
                &self,
                record_type: &str,
                query: &Value,
                options: &RecordOptions,
            ) -> Result<u32, WalletError>;

            async fn search_next(&self, search_handle: u32, count: usize)
                -> Result<Vec<WalletRecord>, WalletError>;

            async fn close_search(&self, search_handle: u32) -> Result<(), WalletError>;

            async fn close(&self) -> Result<(), WalletError>;
        }
    );

    /// runs the exchange until the issuer sent the credential, returns the holder waiting for it,
    /// the issuer and the raw credential message
    async fn issued(
        transport: Arc<FakeTransport>,
        protocol: ProtocolVariant,
    ) -> (Party, Holder, Issuer, String) {
        let alice = party("alice", transport.clone());
        let bob = party("bob", transport.clone());
        let (to_bob, to_alice) = channel(protocol);

        let cred_def = CredentialDef::lookup(&alice.caps, "degree", CRED_DEF_ID, None)
            .await
            .unwrap();
        let mut issuer = Issuer::create(
            "degree",
            &cred_def,
            &json!({"name": "bob"}),
            None,
            protocol,
        )
        .unwrap();
        issuer.send_offer(&alice.caps, &to_bob).await.unwrap();

        let offer = transport.queued("bob-verkey").remove(0);
        transport
            .mark_consumed("bob-verkey", vec![offer.uid.clone()])
            .await
            .unwrap();

        let mut holder = Holder::create_with_offer("bob-degree", &offer.payload).unwrap();
        holder.send_request(&bob.caps, &to_alice).await.unwrap();
        issuer.update_state(&alice.caps).await.unwrap();
        issuer.send_credential(&alice.caps, &to_bob).await.unwrap();

        let credential = transport.last_sent().unwrap().payload;
        (bob, holder, issuer, credential)
    }

    #[tokio::test]
    async fn test_replayed_credential_is_stored_once() {
        let transport = Arc::new(FakeTransport::default());
        let (bob, mut holder, _, credential) = issued(transport, ProtocolVariant::Aries).await;
        let mut replica = holder.clone();

        let state = holder
            .update_state_with_message(&bob.caps, &credential)
            .await
            .unwrap();
        assert_eq!(state, HolderState::Accepted);

        let state = replica
            .update_state_with_message(&bob.caps, &credential)
            .await
            .unwrap();
        assert_eq!(state, HolderState::Accepted);

        assert_eq!(bob.wallet.count(RECORD_TYPE_CREDENTIAL), 1);
        assert_eq!(holder.get_credential_id(), replica.get_credential_id());
    }

    #[tokio::test]
    async fn test_legacy_credential_exchange() {
        let transport = Arc::new(FakeTransport::default());
        let (bob, mut holder, issuer, credential) =
            issued(transport.clone(), ProtocolVariant::Proprietary).await;
        assert_eq!(holder.get_protocol(), ProtocolVariant::Proprietary);

        // no ack in the legacy family, the issuer is done once the credential is sent
        assert_eq!(issuer.get_state(), IssuerState::Accepted);

        // legacy messages may come without msg_ref_id
        let mut credential: Value = serde_json::from_str(&credential).unwrap();
        credential.as_object_mut().unwrap().remove("msg_ref_id");
        let credential = credential.to_string();

        let mut replica = holder.clone();
        for entity in [&mut holder, &mut replica] {
            let state = entity
                .update_state_with_message(&bob.caps, &credential)
                .await
                .unwrap();
            assert_eq!(state, HolderState::Accepted);
        }

        assert_eq!(bob.wallet.count(RECORD_TYPE_CREDENTIAL), 1);
        assert_eq!(holder.get_credential_id(), replica.get_credential_id());
        assert!(transport.queued("alice-verkey").is_empty());
    }

    #[tokio::test]
    async fn test_store_credential_wallet_outcomes() {
        let table = vec![
            (WalletError::Duplicate("cred".to_string()), Some(HolderState::Accepted)),
            (WalletError::Failure("disk full".to_string()), None),
        ];

        for (add_result, expected) in table {
            let transport = Arc::new(FakeTransport::default());
            let (bob, mut holder, _, credential) = issued(transport, ProtocolVariant::Aries).await;

            let mut wallet = MockFakeWallet::new();
            wallet
                .expect_get()
                .returning(|_, id, _| Err(WalletError::NotFound(id.to_string())));
            wallet
                .expect_add()
                .times(1)
                .returning(move |_, _, _, _| Err(add_result.clone()));

            let mut caps = bob.caps.clone();
            caps.wallet = Arc::new(wallet);

            let result = holder.update_state_with_message(&caps, &credential).await;
            match expected {
                Some(state) => assert_eq!(result.unwrap(), state),
                None => {
                    assert!(matches!(result, Err(AgentError::WalletFailure(_))));
                    assert_eq!(holder.get_state(), HolderState::RequestSent);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_negotiation_requires_aries() {
        let transport = Arc::new(FakeTransport::default());
        let bob = party("bob", transport);
        let (_, to_alice) = channel(ProtocolVariant::Proprietary);

        let legacy_offer = json!({
            "msg_type": "CRED_OFFER",
            "version": "1.0",
            "to_did": "did:bob",
            "from_did": "did:alice",
            "msg_ref_id": "offer-1",
            "libindy_offer": format!("{{\"cred_def_id\":\"{}\",\"schema_id\":\"{}\"}}", CRED_DEF_ID, SCHEMA_ID),
            "cred_def_id": CRED_DEF_ID,
            "credential_attrs": {"name": "bob"},
            "claim_name": "degree",
            "claim_id": "claim-1"
        });

        let mut holder = Holder::create_with_offer("bob-degree", &legacy_offer.to_string()).unwrap();
        assert_eq!(holder.get_protocol(), ProtocolVariant::Proprietary);

        let result = holder
            .decline(&bob.caps, &to_alice, None, Some(json!({"name": "alice"})))
            .await;
        assert!(matches!(result, Err(AgentError::ActionNotSupported(_))));

        holder.send_request(&bob.caps, &to_alice).await.unwrap();
        assert_eq!(holder.get_state(), HolderState::RequestSent);
    }

    #[tokio::test]
    async fn test_proposal() {
        let transport = Arc::new(FakeTransport::default());
        let bob = party("bob", transport.clone());
        let (_, to_alice) = channel(ProtocolVariant::Aries);

        let mut holder = Holder::create_with_proposal(
            "bob-degree",
            SCHEMA_ID,
            CRED_DEF_ID,
            &json!({"name": "bob"}),
            None,
        )
        .unwrap();
        assert_eq!(holder.get_state(), HolderState::Initial);

        holder.send_proposal(&bob.caps, &to_alice).await.unwrap();
        assert_eq!(holder.get_state(), HolderState::ProposalSent);
        assert_eq!(transport.queued("alice-verkey").len(), 1);

        let result = holder.send_request(&bob.caps, &to_alice).await;
        assert!(matches!(result, Err(AgentError::InvalidState(_))));
    }

    #[test]
    fn test_create_with_offer_rejects_other_messages() {
        let ping = json!({
            "@type": "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/trust_ping/1.0/ping",
            "@id": "ping-1"
        });

        let result = Holder::create_with_offer("bob", &ping.to_string());
        assert!(matches!(result, Err(AgentError::InvalidInput(_))));
    }
}
