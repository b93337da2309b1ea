use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

use serde::{Deserialize, Serialize};

use crate::types::AgentError;

use super::diddoc::DidDoc;
use super::thread::Thread;

pub const SIGNATURE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/signature/1.0/ed25519Sha512_single";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "recipientKeys")]
    pub recipient_keys: Vec<String>,

    #[serde(rename = "routingKeys", default)]
    pub routing_keys: Vec<String>,

    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

/// `ConnectionData` is the payload shared by a request and a signed response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionData {
    #[serde(rename = "DID")]
    pub did: String,

    #[serde(rename = "DIDDoc")]
    pub did_doc: DidDoc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default)]
    pub label: String,

    pub connection: ConnectionData,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

/// `ConnectionSignature` is the `connection~sig` decorator
///
/// `sig_data` is the base64url encoding of an 8 bytes big-endian timestamp followed by the
/// JSON encoded [`ConnectionData`]. Both the data and the signature stay encoded until the
/// receiving side verifies them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSignature {
    #[serde(rename = "@type", default = "default_signature_type")]
    pub sig_type: String,

    pub signature: String,
    pub sig_data: String,
    pub signer: String,
}

fn default_signature_type() -> String {
    SIGNATURE_TYPE.to_string()
}

impl ConnectionSignature {
    /// `sig_data_bytes` builds the raw bytes that must be signed by the responder
    pub fn sig_data_bytes(data: &ConnectionData, timestamp: u64) -> Result<Vec<u8>, AgentError> {
        let json = serde_json::to_vec(data)
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        let mut bytes = timestamp.to_be_bytes().to_vec();
        bytes.extend(json);
        Ok(bytes)
    }

    pub fn new(sig_data: &[u8], signature: &[u8], signer: &str) -> Self {
        Self {
            sig_type: default_signature_type(),
            signature: URL_SAFE.encode(signature),
            sig_data: URL_SAFE.encode(sig_data),
            signer: signer.to_string(),
        }
    }

    pub fn sig_data_raw(&self) -> Result<Vec<u8>, AgentError> {
        URL_SAFE
            .decode(&self.sig_data)
            .map_err(|err| AgentError::malformed("connection~sig.sig_data", err.to_string()))
    }

    pub fn signature_raw(&self) -> Result<Vec<u8>, AgentError> {
        URL_SAFE
            .decode(&self.signature)
            .map_err(|err| AgentError::malformed("connection~sig.signature", err.to_string()))
    }

    /// `decode_connection` extracts the signed [`ConnectionData`], without checking the signature
    pub fn decode_connection(&self) -> Result<ConnectionData, AgentError> {
        let raw = self.sig_data_raw()?;
        if raw.len() <= 8 {
            return Err(AgentError::malformed(
                "connection~sig.sig_data",
                "missing signed connection data",
            ));
        }

        serde_json::from_slice(&raw[8..])
            .map_err(|err| AgentError::from_serde(err, "connection~sig.sig_data"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,

    #[serde(rename = "connection~sig")]
    pub connection_sig: ConnectionSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::messages::diddoc::DidDoc;

    #[test]
    fn test_signature_data_roundtrip() {
        let data = ConnectionData {
            did: "did-a".to_string(),
            did_doc: DidDoc::new("did-a", "key-a", "https://a.example.com", vec![]),
        };

        let bytes = ConnectionSignature::sig_data_bytes(&data, 1_700_000_000).unwrap();
        assert_eq!(&bytes[..8], &1_700_000_000u64.to_be_bytes());

        let sig = ConnectionSignature::new(&bytes, b"signature", "key-a");
        assert_eq!(sig.sig_data_raw().unwrap(), bytes);
        assert_eq!(sig.signature_raw().unwrap(), b"signature".to_vec());
        assert_eq!(sig.decode_connection().unwrap(), data);
    }

    #[test]
    fn test_signature_data_too_short() {
        let sig = ConnectionSignature::new(&[0u8; 8], b"signature", "key-a");
        assert!(matches!(
            sig.decode_connection(),
            Err(AgentError::MalformedMessage { ref field, .. }) if field == "connection~sig.sig_data"
        ));
    }

    #[test]
    fn test_request_missing_connection() {
        let err = serde_json::from_str::<Request>(r#"{"@id": "1", "label": "alice"}"#).unwrap_err();
        let mapped = AgentError::from_serde(err, "request");
        assert!(matches!(
            mapped,
            AgentError::MalformedMessage { ref field, .. } if field == "connection"
        ));
    }
}
