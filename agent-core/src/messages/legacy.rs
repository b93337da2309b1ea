//! Legacy proprietary message family
//!
//! Every message is a flat JSON object carrying `msg_type`, `version`, `to_did` and `from_did`
//! plus optional `msg_ref_id` and `thread_id`, the kind specific fields sit next to them
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::AgentError;

use super::attachment::{Attachment, Attachments};
use super::connection::{ConnectionData, ConnectionSignature, Invitation, Request, Response};
use super::diddoc::DidDoc;
use super::issuance::{Credential, CredentialOffer, CredentialPreview, CredentialRequest};
use super::notification::{Ack, AckStatus, ProblemReport};
use super::presentation::{Presentation, PresentationRequest};
use super::thread::Thread;
use super::types::{Addressing, AgentMessage};

pub const LEGACY_VERSION: &str = "1.0";

pub const CONN_INVITE: &str = "CONN_INVITE";
pub const CONN_REQ: &str = "CONN_REQ";
pub const CONN_REQ_ANSWER: &str = "CONN_REQ_ANSWER";
pub const ACK: &str = "ACK";
pub const CRED_OFFER: &str = "CRED_OFFER";
pub const CRED_REQ: &str = "CRED_REQ";
pub const CRED: &str = "CRED";
pub const PROOF_REQUEST: &str = "PROOF_REQUEST";
pub const PROOF: &str = "PROOF";
pub const REJECT: &str = "REJECT";

#[derive(Debug, Deserialize, Serialize)]
struct Envelope {
    msg_type: String,

    #[serde(default)]
    version: String,

    to_did: String,
    from_did: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    msg_ref_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ConnInvite {
    #[serde(default)]
    label: String,
    recipient_keys: Vec<String>,

    #[serde(default)]
    routing_keys: Vec<String>,
    service_endpoint: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct ConnRequest {
    #[serde(default)]
    label: String,
    did: String,
    did_doc: DidDoc,
}

#[derive(Debug, Deserialize, Serialize)]
struct ConnRequestAnswer {
    connection_sig: ConnectionSignature,
}

#[derive(Debug, Deserialize, Serialize)]
struct LegacyAck {
    #[serde(default)]
    status: AckStatus,
}

#[derive(Debug, Deserialize, Serialize)]
struct CredOffer {
    libindy_offer: String,
    cred_def_id: String,
    credential_attrs: Value,

    #[serde(default)]
    claim_name: String,
    claim_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct CredRequest {
    libindy_cred_req: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct Cred {
    libindy_cred: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct ProofRequestData {
    proof_request_data: Value,
}

#[derive(Debug, Deserialize, Serialize)]
struct Proof {
    libindy_proof: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct Reject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

fn parse<T: DeserializeOwned>(value: &Value, msg_type: &str) -> Result<T, AgentError> {
    serde_json::from_value(value.clone()).map_err(|err| AgentError::from_serde(err, msg_type))
}

/// `content_id` names a message sent without `msg_ref_id`, the same content always gets the same
/// id so a replayed message is recognised
fn content_id(value: &Value) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, value.to_string().as_bytes()).to_string()
}

pub fn decode(value: Value) -> Result<(AgentMessage, Addressing), AgentError> {
    let envelope: Envelope = parse(&value, "msg_type")?;
    let addressing = Addressing {
        from_did: envelope.from_did.clone(),
        to_did: envelope.to_did.clone(),
    };

    let id = envelope
        .msg_ref_id
        .clone()
        .unwrap_or_else(|| content_id(&value));
    let thread = envelope.thread_id.clone().map(Thread::new);
    let msg_type = envelope.msg_type.as_str();

    let message = match msg_type {
        CONN_INVITE => {
            let payload: ConnInvite = parse(&value, msg_type)?;
            AgentMessage::ConnectionInvitation(Invitation {
                id,
                label: payload.label,
                recipient_keys: payload.recipient_keys,
                routing_keys: payload.routing_keys,
                service_endpoint: payload.service_endpoint,
            })
        }
        CONN_REQ => {
            let payload: ConnRequest = parse(&value, msg_type)?;
            AgentMessage::ConnectionRequest(Request {
                id,
                label: payload.label,
                connection: ConnectionData {
                    did: payload.did,
                    did_doc: payload.did_doc,
                },
                thread,
            })
        }
        CONN_REQ_ANSWER => {
            let payload: ConnRequestAnswer = parse(&value, msg_type)?;
            AgentMessage::ConnectionResponse(Response {
                id,
                thread: thread.unwrap_or_default(),
                connection_sig: payload.connection_sig,
            })
        }
        ACK => {
            let payload: LegacyAck = parse(&value, msg_type)?;
            AgentMessage::Ack(Ack {
                id,
                status: payload.status,
                thread: thread.unwrap_or_default(),
            })
        }
        CRED_OFFER => {
            let payload: CredOffer = parse(&value, msg_type)?;
            let offer_id = envelope.msg_ref_id.clone().unwrap_or(payload.claim_id);
            let mut preview = CredentialPreview::from_values(&payload.credential_attrs)
                .map_err(|err| AgentError::malformed("credential_attrs", err.to_string()))?;
            preview.attributes.sort_by(|a, b| a.name.cmp(&b.name));

            AgentMessage::CredentialOffer(CredentialOffer {
                id: offer_id,
                comment: Some(payload.claim_name).filter(|name| !name.is_empty()),
                credential_preview: preview,
                offers_attach: Attachments::single(Attachment::from_json_str(
                    "libindy-cred-offer-0",
                    &payload.libindy_offer,
                )),
                thread,
            })
        }
        CRED_REQ => {
            let payload: CredRequest = parse(&value, msg_type)?;
            AgentMessage::CredentialRequest(CredentialRequest {
                id,
                comment: None,
                requests_attach: Attachments::single(Attachment::from_json_str(
                    "libindy-cred-request-0",
                    &payload.libindy_cred_req,
                )),
                thread,
            })
        }
        CRED => {
            let payload: Cred = parse(&value, msg_type)?;
            AgentMessage::Credential(Credential {
                id,
                comment: None,
                credentials_attach: Attachments::single(Attachment::from_json_str(
                    "libindy-cred-0",
                    &payload.libindy_cred,
                )),
                thread,
            })
        }
        PROOF_REQUEST => {
            let payload: ProofRequestData = parse(&value, msg_type)?;
            AgentMessage::PresentationRequest(PresentationRequest {
                id,
                comment: None,
                request_presentations_attach: Attachments::single(Attachment::from_json(
                    "libindy-request-presentation-0",
                    &payload.proof_request_data,
                )),
                thread,
            })
        }
        PROOF => {
            let payload: Proof = parse(&value, msg_type)?;
            AgentMessage::Presentation(Presentation {
                id,
                comment: None,
                presentations_attach: Attachments::single(Attachment::from_json_str(
                    "libindy-presentation-0",
                    &payload.libindy_proof,
                )),
                thread,
            })
        }
        REJECT => {
            let payload: Reject = parse(&value, msg_type)?;
            AgentMessage::ProblemReport(ProblemReport {
                id,
                thread: thread.unwrap_or_default(),
                description: None,
                comment: payload.reason,
            })
        }
        _ => AgentMessage::Unknown(value),
    };

    Ok((message, addressing))
}

fn merge<T: Serialize>(envelope: Envelope, payload: &T) -> Result<Value, AgentError> {
    let mut object: Map<String, Value> = match serde_json::to_value(&envelope) {
        Ok(Value::Object(object)) => object,
        Ok(_) => Map::new(),
        Err(err) => return Err(AgentError::SerializationError(err.to_string())),
    };

    match serde_json::to_value(payload) {
        Ok(Value::Object(fields)) => object.extend(fields),
        Ok(_) => {}
        Err(err) => return Err(AgentError::SerializationError(err.to_string())),
    }

    Ok(Value::Object(object))
}

fn first_content(attachments: &Attachments, field: &str) -> Result<String, AgentError> {
    attachments
        .first()
        .ok_or_else(|| AgentError::malformed(field, "attachment is empty"))?
        .content_string()
}

/// `encode` builds the flat legacy message, Aries only kinds are rejected
pub fn encode(message: &AgentMessage, addressing: &Addressing) -> Result<Value, AgentError> {
    let envelope = |msg_type: &str| Envelope {
        msg_type: msg_type.to_string(),
        version: LEGACY_VERSION.to_string(),
        to_did: addressing.to_did.clone(),
        from_did: addressing.from_did.clone(),
        msg_ref_id: message.id(),
        thread_id: message.thread().and_then(|thread| thread.thid.clone()),
    };

    match message {
        AgentMessage::ConnectionInvitation(msg) => merge(
            envelope(CONN_INVITE),
            &ConnInvite {
                label: msg.label.clone(),
                recipient_keys: msg.recipient_keys.clone(),
                routing_keys: msg.routing_keys.clone(),
                service_endpoint: msg.service_endpoint.clone(),
            },
        ),
        AgentMessage::ConnectionRequest(msg) => merge(
            envelope(CONN_REQ),
            &ConnRequest {
                label: msg.label.clone(),
                did: msg.connection.did.clone(),
                did_doc: msg.connection.did_doc.clone(),
            },
        ),
        AgentMessage::ConnectionResponse(msg) => merge(
            envelope(CONN_REQ_ANSWER),
            &ConnRequestAnswer {
                connection_sig: msg.connection_sig.clone(),
            },
        ),
        AgentMessage::Ack(msg) => merge(envelope(ACK), &LegacyAck { status: msg.status }),
        AgentMessage::CredentialOffer(msg) => {
            let offer: Value = msg.offers_attach.content_value("offers~attach")?;
            merge(
                envelope(CRED_OFFER),
                &CredOffer {
                    libindy_offer: offer.to_string(),
                    cred_def_id: msg.cred_def_id()?,
                    credential_attrs: msg.credential_preview.to_values(),
                    claim_name: msg.comment.clone().unwrap_or_default(),
                    claim_id: msg.id.clone(),
                },
            )
        }
        AgentMessage::CredentialRequest(msg) => merge(
            envelope(CRED_REQ),
            &CredRequest {
                libindy_cred_req: first_content(&msg.requests_attach, "requests~attach")?,
            },
        ),
        AgentMessage::Credential(msg) => merge(
            envelope(CRED),
            &Cred {
                libindy_cred: first_content(&msg.credentials_attach, "credentials~attach")?,
            },
        ),
        AgentMessage::PresentationRequest(msg) => merge(
            envelope(PROOF_REQUEST),
            &ProofRequestData {
                proof_request_data: msg
                    .request_presentations_attach
                    .content_value("request_presentations~attach")?,
            },
        ),
        AgentMessage::Presentation(msg) => merge(
            envelope(PROOF),
            &Proof {
                libindy_proof: first_content(&msg.presentations_attach, "presentations~attach")?,
            },
        ),
        AgentMessage::ProblemReport(msg) => merge(
            envelope(REJECT),
            &Reject {
                reason: Some(msg.reason()).filter(|reason| !reason.is_empty()),
            },
        ),
        other => Err(AgentError::ActionNotSupported(format!(
            "{} is not available for the proprietary protocol",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::messages::codec;
    use crate::messages::trust_ping::Ping;
    use crate::messages::types::MessageKind;
    use crate::types::ProtocolVariant;

    #[test]
    fn test_message_id_without_msg_ref_id() {
        let credential = |libindy_cred: &str, msg_ref_id: Option<&str>| {
            let mut raw = json!({
                "msg_type": "CRED",
                "version": "1.0",
                "to_did": "did-holder",
                "from_did": "did-issuer",
                "thread_id": "thread-1",
                "libindy_cred": libindy_cred
            });
            if let Some(id) = msg_ref_id {
                raw["msg_ref_id"] = json!(id);
            }

            let (message, _) = decode(raw).unwrap();
            message.id().unwrap()
        };

        let first = credential("{\"values\":{}}", None);
        assert_eq!(first, credential("{\"values\":{}}", None));
        assert_ne!(first, credential("{\"values\":{\"name\":\"bob\"}}", None));
        assert_eq!(credential("{\"values\":{}}", Some("cred-1")), "cred-1");
    }

    #[test]
    fn test_decode_legacy_offer() {
        let raw = json!({
            "msg_type": "CRED_OFFER",
            "version": "0.1",
            "to_did": "did-holder",
            "from_did": "did-issuer",
            "libindy_offer": "{\"cred_def_id\":\"cred-def-1\",\"nonce\":\"1\"}",
            "cred_def_id": "cred-def-1",
            "credential_attrs": {"name": "alice", "age": "25"},
            "claim_name": "profile",
            "claim_id": "claim-1",
            "unknown_field": true
        });

        let decoded = codec::decode(&raw.to_string()).unwrap();
        assert_eq!(decoded.protocol, ProtocolVariant::Proprietary);
        assert_eq!(
            decoded.addressing,
            Some(Addressing {
                from_did: "did-issuer".to_string(),
                to_did: "did-holder".to_string(),
            })
        );

        match decoded.message {
            AgentMessage::CredentialOffer(offer) => {
                assert_eq!(offer.id, "claim-1");
                assert_eq!(offer.comment.as_deref(), Some("profile"));
                assert_eq!(offer.cred_def_id().unwrap(), "cred-def-1");
                assert_eq!(offer.credential_preview.attributes.len(), 2);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_legacy_missing_field() {
        let table = vec![
            (
                json!({"msg_type": "CRED_REQ", "to_did": "a", "from_did": "b"}),
                "libindy_cred_req",
            ),
            (
                json!({"msg_type": "ACK", "from_did": "b"}),
                "to_did",
            ),
        ];

        for (input, expected) in table {
            let err = codec::decode(&input.to_string()).unwrap_err();
            assert!(
                matches!(err, AgentError::MalformedMessage { ref field, .. } if field == expected),
                "{:?}",
                err
            );
        }
    }

    #[test]
    fn test_encode_legacy_ack() {
        let ack = AgentMessage::Ack(Ack {
            id: "ack-1".to_string(),
            status: AckStatus::Ok,
            thread: Thread::new("thread-1"),
        });
        let addressing = Addressing {
            from_did: "did-a".to_string(),
            to_did: "did-b".to_string(),
        };

        let raw = codec::encode(ProtocolVariant::Proprietary, &ack, &addressing).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["msg_type"], "ACK");
        assert_eq!(value["to_did"], "did-b");
        assert_eq!(value["thread_id"], "thread-1");
        assert_eq!(value["status"], "OK");

        let decoded = codec::decode(&raw).unwrap();
        assert_eq!(decoded.kind(), MessageKind::Ack);
        assert_eq!(decoded.message, ack);
    }

    #[test]
    fn test_encode_aries_only_kind() {
        let ping = AgentMessage::Ping(Ping {
            id: "ping-1".to_string(),
            ..Default::default()
        });

        let err = codec::encode(ProtocolVariant::Proprietary, &ping, &Addressing::default()).unwrap_err();
        assert!(matches!(err, AgentError::ActionNotSupported(_)));
    }

    #[test]
    fn test_unknown_legacy_kind() {
        let raw = json!({"msg_type": "PAYMENT", "to_did": "a", "from_did": "b"});
        let decoded = codec::decode(&raw.to_string()).unwrap();
        assert_eq!(decoded.kind(), MessageKind::Unknown);
    }
}
