use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::AgentError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairwiseInfo {
    pub did: String,
    pub verkey: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialRequestData {
    pub request: Value,
    pub metadata: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuedCredential {
    pub credential: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_rev_id: Option<String>,
}

/// `RevocationConfig` is given to the crypto capability when the credential definition supports
/// revocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevocationConfig {
    pub rev_reg_id: String,
    pub tails_file: String,
}

/// `CryptoBuilder` exposes the credential cryptography, signature schemes and blinded secrets
/// are owned by the implementer
///
/// Every JSON object is passed as is between the protocol messages and this capability
#[async_trait]
pub trait CryptoBuilder: Send + Sync {
    async fn create_pairwise_did(&self) -> Result<PairwiseInfo, AgentError>;

    async fn sign(&self, verkey: &str, data: &[u8]) -> Result<Vec<u8>, AgentError>;

    async fn verify(&self, verkey: &str, data: &[u8], signature: &[u8])
        -> Result<bool, AgentError>;

    async fn generate_nonce(&self) -> Result<String, AgentError>;

    async fn create_credential_offer(&self, cred_def_id: &str) -> Result<Value, AgentError>;

    async fn create_credential_request(
        &self,
        prover_did: &str,
        offer: &Value,
        cred_def: &Value,
    ) -> Result<CredentialRequestData, AgentError>;

    async fn create_credential(
        &self,
        offer: &Value,
        request: &Value,
        values: &Value,
        revocation: Option<RevocationConfig>,
    ) -> Result<IssuedCredential, AgentError>;

    /// `process_credential` returns the credential ready to be stored in the wallet
    async fn process_credential(
        &self,
        credential: &Value,
        request_metadata: &Value,
        cred_def: &Value,
    ) -> Result<Value, AgentError>;

    /// `search_credentials_for_request` returns the wallet credentials matching each referent
    async fn search_credentials_for_request(&self, proof_request: &Value)
        -> Result<Value, AgentError>;

    async fn create_proof(
        &self,
        proof_request: &Value,
        selected_credentials: &Value,
        self_attested_attrs: &Value,
        schemas: &Value,
        cred_defs: &Value,
    ) -> Result<Value, AgentError>;

    async fn verify_proof(
        &self,
        proof_request: &Value,
        proof: &Value,
        schemas: &Value,
        cred_defs: &Value,
    ) -> Result<bool, AgentError>;
}
