//! In-memory collaborators shared by the integration tests, every agent of a test talks through the
//! same [`FakeTransport`]
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use prople_agent_api::config::AgentConfig;
use prople_agent_api::dispatcher::CommandHandle;
use prople_agent_api::{logging, Context};
use prople_agent_core::capability::crypto::{
    CredentialRequestData, CryptoBuilder, IssuedCredential, PairwiseInfo, RevocationConfig,
};
use prople_agent_core::capability::ledger::{CacheOptions, LedgerBuilder, ResourceKind};
use prople_agent_core::capability::transport::{InboundMessage, OutboundMessage, TransportBuilder};
use prople_agent_core::capability::wallet::{RecordOptions, WalletBuilder, WalletRecord};
use prople_agent_core::handle::Handle;
use prople_agent_core::types::{AgentError, WalletError};

pub const SCHEMA_ID: &str = "schema-1";
pub const CRED_DEF_ID: &str = "cred-def-1";

pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(5);

pub type Reply<T> = Box<dyn FnOnce(CommandHandle, Result<T, AgentError>) + Send>;

/// `call` queues a command and waits for its continuation
pub fn call<T, F>(submit: F) -> Result<T, AgentError>
where
    T: Send + 'static,
    F: FnOnce(Reply<T>) -> Result<(), AgentError>,
{
    let (tx, rx) = mpsc::channel();
    submit(Box::new(move |_, result| {
        let _ = tx.send(result);
    }))?;

    rx.recv_timeout(COMPLETION_TIMEOUT)
        .map_err(|_| AgentError::Unknown("the continuation never fired".to_string()))?
}

#[derive(Default)]
pub struct FakeTransport {
    counter: AtomicU32,
    queues: Mutex<HashMap<String, Vec<InboundMessage>>>,
    pub sent: Mutex<Vec<OutboundMessage>>,
}

impl FakeTransport {
    pub fn queued(&self, verkey: &str) -> Vec<InboundMessage> {
        self.queues
            .lock()
            .unwrap()
            .get(verkey)
            .cloned()
            .unwrap_or_default()
    }

    pub fn last_sent(&self) -> Option<OutboundMessage> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TransportBuilder for FakeTransport {
    async fn send(&self, message: OutboundMessage) -> Result<(), AgentError> {
        let recipient = message
            .recipient_keys
            .first()
            .cloned()
            .ok_or_else(|| AgentError::TransportFailure("no recipient".to_string()))?;

        let uid = format!("uid-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.queues
            .lock()
            .unwrap()
            .entry(recipient)
            .or_default()
            .push(InboundMessage {
                uid,
                payload: message.payload.clone(),
            });
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn poll(&self, recipient_verkey: &str) -> Result<Vec<InboundMessage>, AgentError> {
        Ok(self.queued(recipient_verkey))
    }

    async fn mark_consumed(
        &self,
        recipient_verkey: &str,
        uids: Vec<String>,
    ) -> Result<(), AgentError> {
        if let Some(queue) = self.queues.lock().unwrap().get_mut(recipient_verkey) {
            queue.retain(|message| !uids.contains(&message.uid));
        }

        Ok(())
    }
}

pub struct FakeCrypto {
    name: String,
    counter: AtomicU32,
    pub proof_valid: AtomicBool,
}

impl FakeCrypto {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            counter: AtomicU32::new(0),
            proof_valid: AtomicBool::new(true),
        }
    }

    fn signature(verkey: &str, data: &[u8]) -> Vec<u8> {
        let sum: u64 = data.iter().map(|byte| *byte as u64).sum();
        format!("{}:{}:{}", verkey, data.len(), sum).into_bytes()
    }
}

#[async_trait]
impl CryptoBuilder for FakeCrypto {
    async fn create_pairwise_did(&self) -> Result<PairwiseInfo, AgentError> {
        let idx = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(PairwiseInfo {
            did: format!("{}-did-{}", self.name, idx),
            verkey: format!("{}-key-{}", self.name, idx),
        })
    }

    async fn sign(&self, verkey: &str, data: &[u8]) -> Result<Vec<u8>, AgentError> {
        Ok(Self::signature(verkey, data))
    }

    async fn verify(
        &self,
        verkey: &str,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, AgentError> {
        Ok(Self::signature(verkey, data) == signature)
    }

    async fn generate_nonce(&self) -> Result<String, AgentError> {
        Ok("987654321".to_string())
    }

    async fn create_credential_offer(&self, cred_def_id: &str) -> Result<Value, AgentError> {
        Ok(json!({"cred_def_id": cred_def_id, "schema_id": SCHEMA_ID, "nonce": "1"}))
    }

    async fn create_credential_request(
        &self,
        prover_did: &str,
        offer: &Value,
        _cred_def: &Value,
    ) -> Result<CredentialRequestData, AgentError> {
        Ok(CredentialRequestData {
            request: json!({"prover_did": prover_did, "cred_def_id": offer["cred_def_id"]}),
            metadata: json!({"master_secret_blinding_data": "blinded"}),
        })
    }

    async fn create_credential(
        &self,
        offer: &Value,
        _request: &Value,
        values: &Value,
        revocation: Option<RevocationConfig>,
    ) -> Result<IssuedCredential, AgentError> {
        let rev_reg_id = revocation.as_ref().map(|config| config.rev_reg_id.clone());
        Ok(IssuedCredential {
            credential: json!({
                "schema_id": offer["schema_id"],
                "cred_def_id": offer["cred_def_id"],
                "rev_reg_id": rev_reg_id,
                "values": values,
            }),
            cred_rev_id: revocation.map(|_| "1".to_string()),
        })
    }

    async fn process_credential(
        &self,
        credential: &Value,
        _request_metadata: &Value,
        _cred_def: &Value,
    ) -> Result<Value, AgentError> {
        Ok(credential.clone())
    }

    async fn search_credentials_for_request(
        &self,
        proof_request: &Value,
    ) -> Result<Value, AgentError> {
        let mut attrs = serde_json::Map::new();
        if let Some(requested) = proof_request["requested_attributes"].as_object() {
            for referent in requested.keys() {
                attrs.insert(
                    referent.clone(),
                    json!([{"cred_info": {
                        "referent": "cred-1",
                        "schema_id": SCHEMA_ID,
                        "cred_def_id": CRED_DEF_ID,
                    }}]),
                );
            }
        }

        Ok(json!({"attrs": attrs}))
    }

    async fn create_proof(
        &self,
        proof_request: &Value,
        _selected_credentials: &Value,
        self_attested_attrs: &Value,
        _schemas: &Value,
        cred_defs: &Value,
    ) -> Result<Value, AgentError> {
        let identifiers: Vec<Value> = cred_defs
            .as_object()
            .map(|defs| {
                defs.keys()
                    .map(|cred_def_id| json!({"schema_id": SCHEMA_ID, "cred_def_id": cred_def_id}))
                    .collect()
            })
            .unwrap_or_default();

        Ok(json!({
            "proof": {"nonce": proof_request["nonce"]},
            "requested_proof": {"self_attested_attrs": self_attested_attrs},
            "identifiers": identifiers,
        }))
    }

    async fn verify_proof(
        &self,
        _proof_request: &Value,
        _proof: &Value,
        _schemas: &Value,
        _cred_defs: &Value,
    ) -> Result<bool, AgentError> {
        Ok(self.proof_valid.load(Ordering::SeqCst))
    }
}

/// `FakeLedger` publishes one schema and one credential definition, `unreachable` makes every
/// resolution fail
#[derive(Default)]
pub struct FakeLedger {
    pub calls: AtomicU32,
    pub unreachable: AtomicBool,
    pub closed: AtomicBool,
}

#[async_trait]
impl LedgerBuilder for FakeLedger {
    async fn resolve(
        &self,
        kind: ResourceKind,
        id: &str,
        _options: &CacheOptions,
    ) -> Result<Value, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AgentError::ResolutionFailed(format!(
                "ledger unreachable while resolving {}",
                id
            )));
        }

        match (kind, id) {
            (ResourceKind::Schema, SCHEMA_ID) => Ok(json!({
                "id": SCHEMA_ID,
                "name": "degree",
                "version": "1.0",
                "attrNames": ["name", "degree"],
            })),
            (ResourceKind::CredentialDefinition, CRED_DEF_ID) => {
                Ok(json!({"id": CRED_DEF_ID, "schemaId": SCHEMA_ID, "tag": "default"}))
            }
            _ => Err(AgentError::ResolutionFailed(format!("{} not found: {}", kind, id))),
        }
    }

    async fn close(&self) -> Result<(), AgentError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeWallet {
    records: Mutex<HashMap<(String, String), WalletRecord>>,
    searches: Mutex<HashMap<u32, Vec<WalletRecord>>>,
    counter: AtomicU32,
    pub closed: AtomicBool,
}

impl FakeWallet {
    pub fn count(&self, record_type: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .keys()
            .filter(|(kind, _)| kind == record_type)
            .count()
    }
}

#[async_trait]
impl WalletBuilder for FakeWallet {
    async fn add(
        &self,
        record_type: &str,
        id: &str,
        value: &str,
        tags: Option<HashMap<String, String>>,
    ) -> Result<(), WalletError> {
        let mut records = self.records.lock().unwrap();
        let key = (record_type.to_string(), id.to_string());
        if records.contains_key(&key) {
            return Err(WalletError::Duplicate(id.to_string()));
        }

        records.insert(
            key,
            WalletRecord {
                id: id.to_string(),
                record_type: Some(record_type.to_string()),
                value: Some(value.to_string()),
                tags,
            },
        );
        Ok(())
    }

    async fn get(
        &self,
        record_type: &str,
        id: &str,
        _options: &RecordOptions,
    ) -> Result<WalletRecord, WalletError> {
        self.records
            .lock()
            .unwrap()
            .get(&(record_type.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| WalletError::NotFound(id.to_string()))
    }

    async fn update_value(
        &self,
        record_type: &str,
        id: &str,
        value: &str,
    ) -> Result<(), WalletError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(record_type.to_string(), id.to_string()))
            .ok_or_else(|| WalletError::NotFound(id.to_string()))?;

        record.value = Some(value.to_string());
        Ok(())
    }

    async fn update_tags(
        &self,
        record_type: &str,
        id: &str,
        tags: HashMap<String, String>,
    ) -> Result<(), WalletError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&(record_type.to_string(), id.to_string()))
            .ok_or_else(|| WalletError::NotFound(id.to_string()))?;

        record.tags = Some(tags);
        Ok(())
    }

    async fn delete(&self, record_type: &str, id: &str) -> Result<(), WalletError> {
        self.records
            .lock()
            .unwrap()
            .remove(&(record_type.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| WalletError::NotFound(id.to_string()))
    }

    async fn open_search(
        &self,
        record_type: &str,
        _query: &Value,
        _options: &RecordOptions,
    ) -> Result<u32, WalletError> {
        let found: Vec<WalletRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|((kind, _), _)| kind == record_type)
            .map(|(_, record)| record.clone())
            .collect();

        let handle = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.searches.lock().unwrap().insert(handle, found);
        Ok(handle)
    }

    async fn search_next(
        &self,
        search_handle: u32,
        count: usize,
    ) -> Result<Vec<WalletRecord>, WalletError> {
        let mut searches = self.searches.lock().unwrap();
        let records = searches
            .get_mut(&search_handle)
            .ok_or_else(|| WalletError::Failure("invalid search handle".to_string()))?;

        let take = count.min(records.len());
        Ok(records.drain(..take).collect())
    }

    async fn close_search(&self, search_handle: u32) -> Result<(), WalletError> {
        self.searches
            .lock()
            .unwrap()
            .remove(&search_handle)
            .map(|_| ())
            .ok_or_else(|| WalletError::Failure("invalid search handle".to_string()))
    }

    async fn close(&self) -> Result<(), WalletError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// `Agent` is a context along with the fakes injected into it
pub struct Agent {
    pub ctx: Arc<Context>,
    pub wallet: Arc<FakeWallet>,
    pub ledger: Arc<FakeLedger>,
    pub crypto: Arc<FakeCrypto>,
}

pub fn agent(name: &str, transport: Arc<FakeTransport>) -> Agent {
    let config = AgentConfig::new(name, &format!("https://{}.example.com", name));
    agent_with_config(name, config, transport)
}

pub fn agent_with_config(name: &str, config: AgentConfig, transport: Arc<FakeTransport>) -> Agent {
    logging::init(&config.logging().level());

    let wallet = Arc::new(FakeWallet::default());
    let ledger = Arc::new(FakeLedger::default());
    let crypto = Arc::new(FakeCrypto::new(name));

    let ctx = Context::new(config, wallet.clone(), ledger.clone(), transport, crypto.clone()).unwrap();
    Agent {
        ctx,
        wallet,
        ledger,
        crypto,
    }
}

/// `connected` runs the whole handshake, `alice` is the inviter, it returns the connection handle
/// of each side
pub fn connected(alice: &Agent, bob: &Agent) -> (Handle, Handle) {
    let inviter = call(|reply| alice.ctx.connection().create(1, "alice-conn", reply)).unwrap();
    let invite = alice.ctx.connection().invite_details(inviter).unwrap();

    let invitee = call(|reply| {
        bob.ctx
            .connection()
            .create_with_invite(2, "bob-conn", &invite, reply)
    })
    .unwrap();

    call(|reply| bob.ctx.connection().connect(3, invitee, reply)).unwrap();
    call(|reply| alice.ctx.connection().update_state(4, inviter, reply)).unwrap();
    call(|reply| bob.ctx.connection().update_state(5, invitee, reply)).unwrap();
    call(|reply| alice.ctx.connection().update_state(6, inviter, reply)).unwrap();

    (inviter, invitee)
}
