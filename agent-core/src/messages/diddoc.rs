use serde::{Deserialize, Serialize};

use crate::types::AgentError;

pub const CONTEXT: &str = "https://w3id.org/did/v1";
pub const KEY_TYPE: &str = "Ed25519VerificationKey2018";
pub const KEY_AUTHENTICATION_TYPE: &str = "Ed25519SignatureAuthentication2018";
pub const SERVICE_TYPE: &str = "IndyAgent";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicKey {
    pub id: String,

    #[serde(rename = "type")]
    pub key_type: String,

    pub controller: String,

    #[serde(rename = "publicKeyBase58")]
    pub public_key_base58: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Authentication {
    #[serde(rename = "type")]
    pub auth_type: String,

    #[serde(rename = "publicKey")]
    pub public_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,

    #[serde(rename = "type", default)]
    pub service_type: String,

    #[serde(default)]
    pub priority: u32,

    #[serde(rename = "recipientKeys", default)]
    pub recipient_keys: Vec<String>,

    #[serde(rename = "routingKeys", default)]
    pub routing_keys: Vec<String>,

    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

impl Service {
    pub fn new(did: &str, endpoint: &str, recipient_keys: Vec<String>, routing_keys: Vec<String>) -> Self {
        Self {
            id: format!("did:sov:{};indy", did),
            service_type: SERVICE_TYPE.to_string(),
            priority: 0,
            recipient_keys,
            routing_keys,
            service_endpoint: endpoint.to_string(),
        }
    }
}

/// `DidDoc` is the DID document exchanged during the connection handshake
///
/// Only the fields needed to route messages to the peer are modelled, unknown fields are ignored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DidDoc {
    #[serde(rename = "@context", default)]
    pub context: String,

    pub id: String,

    #[serde(rename = "publicKey", default)]
    pub public_key: Vec<PublicKey>,

    #[serde(default)]
    pub authentication: Vec<Authentication>,

    #[serde(default)]
    pub service: Vec<Service>,
}

impl DidDoc {
    pub fn new(did: &str, verkey: &str, endpoint: &str, routing_keys: Vec<String>) -> Self {
        let key_id = format!("{}#1", did);
        Self {
            context: CONTEXT.to_string(),
            id: did.to_string(),
            public_key: vec![PublicKey {
                id: key_id.clone(),
                key_type: KEY_TYPE.to_string(),
                controller: did.to_string(),
                public_key_base58: verkey.to_string(),
            }],
            authentication: vec![Authentication {
                auth_type: KEY_AUTHENTICATION_TYPE.to_string(),
                public_key: key_id,
            }],
            service: vec![Service::new(
                did,
                endpoint,
                vec![verkey.to_string()],
                routing_keys,
            )],
        }
    }

    pub fn recipient_keys(&self) -> Vec<String> {
        self.service
            .first()
            .map(|service| service.recipient_keys.clone())
            .unwrap_or_default()
    }

    pub fn routing_keys(&self) -> Vec<String> {
        self.service
            .first()
            .map(|service| service.routing_keys.clone())
            .unwrap_or_default()
    }

    pub fn endpoint(&self) -> Option<String> {
        self.service
            .first()
            .map(|service| service.service_endpoint.clone())
    }

    /// `validate` checks the document carries everything needed to reach the peer
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.id.is_empty() {
            return Err(AgentError::malformed("DIDDoc.id", "empty DID"));
        }

        let service = self
            .service
            .first()
            .ok_or_else(|| AgentError::malformed("DIDDoc.service", "no service defined"))?;

        if service.recipient_keys.is_empty() {
            return Err(AgentError::malformed(
                "DIDDoc.service.recipientKeys",
                "no recipient key defined",
            ));
        }

        if service.service_endpoint.is_empty() {
            return Err(AgentError::malformed(
                "DIDDoc.service.serviceEndpoint",
                "empty endpoint",
            ));
        }

        Ok(())
    }
}
