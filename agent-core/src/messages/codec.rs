use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::types::{AgentError, ProtocolVariant};

use super::legacy;
use super::message_type::{MessageFamily, MessageType};
use super::types::{Addressing, AgentMessage, Decoded};

/// `decode` turns a raw wire message into its typed representation
///
/// The family is selected from the discriminator field: an `@type` URI selects the Aries family,
/// a `msg_type` field selects the legacy proprietary family
pub fn decode(raw: &str) -> Result<Decoded, AgentError> {
    trace!("decoding message: {}", raw);

    let value: Value =
        serde_json::from_str(raw).map_err(|err| AgentError::malformed("message", err.to_string()))?;

    decode_value(value)
}

pub fn decode_value(value: Value) -> Result<Decoded, AgentError> {
    let object = value
        .as_object()
        .ok_or_else(|| AgentError::malformed("message", "expected a JSON object"))?;

    if let Some(msg_type) = object.get("@type") {
        let msg_type = msg_type
            .as_str()
            .ok_or_else(|| AgentError::malformed("@type", "expected a string"))?;

        let msg_type = MessageType::parse(msg_type)?;
        let message = decode_aries(&msg_type, value)?;
        return Ok(Decoded {
            protocol: ProtocolVariant::Aries,
            message,
            addressing: None,
        });
    }

    if object.contains_key("msg_type") {
        let (message, addressing) = legacy::decode(value)?;
        return Ok(Decoded {
            protocol: ProtocolVariant::Proprietary,
            message,
            addressing: Some(addressing),
        });
    }

    Err(AgentError::malformed(
        "@type",
        "missing message type discriminator",
    ))
}

/// `encode` builds the wire message of the given protocol family
///
/// The addressing is only used by the legacy family
pub fn encode(
    protocol: ProtocolVariant,
    message: &AgentMessage,
    addressing: &Addressing,
) -> Result<String, AgentError> {
    let value = match protocol {
        ProtocolVariant::Aries => encode_aries(message)?,
        ProtocolVariant::Proprietary => legacy::encode(message, addressing)?,
    };

    serde_json::to_string(&value).map_err(|err| AgentError::SerializationError(err.to_string()))
}

fn parse<T: DeserializeOwned>(value: Value, msg_type: &MessageType) -> Result<T, AgentError> {
    serde_json::from_value(value).map_err(|err| AgentError::from_serde(err, &msg_type.name))
}

fn decode_aries(msg_type: &MessageType, value: Value) -> Result<AgentMessage, AgentError> {
    let family = match msg_type.family() {
        Some(family) if msg_type.is_compatible() => family,
        _ => return Ok(AgentMessage::Unknown(value)),
    };

    let name = msg_type.name.as_str();
    let message = match (family, name) {
        (MessageFamily::Connections, "invitation") => {
            AgentMessage::ConnectionInvitation(parse(value, msg_type)?)
        }
        (MessageFamily::Connections, "request") => {
            AgentMessage::ConnectionRequest(parse(value, msg_type)?)
        }
        (MessageFamily::Connections, "response") => {
            AgentMessage::ConnectionResponse(parse(value, msg_type)?)
        }
        (MessageFamily::TrustPing, "ping") => AgentMessage::Ping(parse(value, msg_type)?),
        (MessageFamily::TrustPing, "ping_response") => {
            AgentMessage::PingResponse(parse(value, msg_type)?)
        }
        (MessageFamily::DiscoveryFeatures, "query") => AgentMessage::Query(parse(value, msg_type)?),
        (MessageFamily::DiscoveryFeatures, "disclose") => {
            AgentMessage::Disclose(parse(value, msg_type)?)
        }
        (MessageFamily::BasicMessage, "message") => {
            AgentMessage::BasicMessage(parse(value, msg_type)?)
        }
        (MessageFamily::OutOfBand, "invitation") => {
            AgentMessage::OutOfBandInvitation(parse(value, msg_type)?)
        }
        (MessageFamily::OutOfBand, "handshake-reuse") => {
            AgentMessage::HandshakeReuse(parse(value, msg_type)?)
        }
        (MessageFamily::OutOfBand, "handshake-reuse-accepted") => {
            AgentMessage::HandshakeReuseAccepted(parse(value, msg_type)?)
        }
        (MessageFamily::QuestionAnswer, "question") => {
            AgentMessage::Question(parse(value, msg_type)?)
        }
        (MessageFamily::QuestionAnswer, "answer") => AgentMessage::Answer(parse(value, msg_type)?),
        (MessageFamily::CredentialIssuance, "propose-credential") => {
            AgentMessage::CredentialProposal(parse(value, msg_type)?)
        }
        (MessageFamily::CredentialIssuance, "offer-credential") => {
            AgentMessage::CredentialOffer(parse(value, msg_type)?)
        }
        (MessageFamily::CredentialIssuance, "request-credential") => {
            AgentMessage::CredentialRequest(parse(value, msg_type)?)
        }
        (MessageFamily::CredentialIssuance, "issue-credential") => {
            AgentMessage::Credential(parse(value, msg_type)?)
        }
        (MessageFamily::PresentProof, "propose-presentation") => {
            AgentMessage::PresentationProposal(parse(value, msg_type)?)
        }
        (MessageFamily::PresentProof, "request-presentation") => {
            AgentMessage::PresentationRequest(parse(value, msg_type)?)
        }
        (MessageFamily::PresentProof, "presentation") => {
            AgentMessage::Presentation(parse(value, msg_type)?)
        }
        (_, "ack") => AgentMessage::Ack(parse(value, msg_type)?),
        (_, "problem-report") | (_, "problem_report") => {
            AgentMessage::ProblemReport(parse(value, msg_type)?)
        }
        _ => AgentMessage::Unknown(value),
    };

    Ok(message)
}

fn aries_type(message: &AgentMessage) -> Option<MessageType> {
    let (family, name) = match message {
        AgentMessage::ConnectionInvitation(_) => (MessageFamily::Connections, "invitation"),
        AgentMessage::ConnectionRequest(_) => (MessageFamily::Connections, "request"),
        AgentMessage::ConnectionResponse(_) => (MessageFamily::Connections, "response"),
        AgentMessage::Ack(_) => (MessageFamily::Notification, "ack"),
        AgentMessage::ProblemReport(_) => (MessageFamily::ReportProblem, "problem-report"),
        AgentMessage::Ping(_) => (MessageFamily::TrustPing, "ping"),
        AgentMessage::PingResponse(_) => (MessageFamily::TrustPing, "ping_response"),
        AgentMessage::Query(_) => (MessageFamily::DiscoveryFeatures, "query"),
        AgentMessage::Disclose(_) => (MessageFamily::DiscoveryFeatures, "disclose"),
        AgentMessage::OutOfBandInvitation(_) => (MessageFamily::OutOfBand, "invitation"),
        AgentMessage::HandshakeReuse(_) => (MessageFamily::OutOfBand, "handshake-reuse"),
        AgentMessage::HandshakeReuseAccepted(_) => {
            (MessageFamily::OutOfBand, "handshake-reuse-accepted")
        }
        AgentMessage::Question(_) => (MessageFamily::QuestionAnswer, "question"),
        AgentMessage::Answer(_) => (MessageFamily::QuestionAnswer, "answer"),
        AgentMessage::BasicMessage(_) => (MessageFamily::BasicMessage, "message"),
        AgentMessage::CredentialProposal(_) => {
            (MessageFamily::CredentialIssuance, "propose-credential")
        }
        AgentMessage::CredentialOffer(_) => (MessageFamily::CredentialIssuance, "offer-credential"),
        AgentMessage::CredentialRequest(_) => {
            (MessageFamily::CredentialIssuance, "request-credential")
        }
        AgentMessage::Credential(_) => (MessageFamily::CredentialIssuance, "issue-credential"),
        AgentMessage::PresentationProposal(_) => {
            (MessageFamily::PresentProof, "propose-presentation")
        }
        AgentMessage::PresentationRequest(_) => {
            (MessageFamily::PresentProof, "request-presentation")
        }
        AgentMessage::Presentation(_) => (MessageFamily::PresentProof, "presentation"),
        AgentMessage::Unknown(_) => return None,
    };

    Some(MessageType::build(family, name))
}

fn to_object<T: Serialize>(payload: &T) -> Result<Map<String, Value>, AgentError> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(AgentError::SerializationError(
            "message payload must be a JSON object".to_string(),
        )),
        Err(err) => Err(AgentError::SerializationError(err.to_string())),
    }
}

fn encode_aries(message: &AgentMessage) -> Result<Value, AgentError> {
    let mut object = match message {
        AgentMessage::ConnectionInvitation(msg) => to_object(msg)?,
        AgentMessage::ConnectionRequest(msg) => to_object(msg)?,
        AgentMessage::ConnectionResponse(msg) => to_object(msg)?,
        AgentMessage::Ack(msg) => to_object(msg)?,
        AgentMessage::ProblemReport(msg) => to_object(msg)?,
        AgentMessage::Ping(msg) => to_object(msg)?,
        AgentMessage::PingResponse(msg) => to_object(msg)?,
        AgentMessage::Query(msg) => to_object(msg)?,
        AgentMessage::Disclose(msg) => to_object(msg)?,
        AgentMessage::OutOfBandInvitation(msg) => to_object(msg)?,
        AgentMessage::HandshakeReuse(msg) => to_object(msg)?,
        AgentMessage::HandshakeReuseAccepted(msg) => to_object(msg)?,
        AgentMessage::Question(msg) => to_object(msg)?,
        AgentMessage::Answer(msg) => to_object(msg)?,
        AgentMessage::BasicMessage(msg) => to_object(msg)?,
        AgentMessage::CredentialProposal(msg) => to_object(msg)?,
        AgentMessage::CredentialOffer(msg) => to_object(msg)?,
        AgentMessage::CredentialRequest(msg) => to_object(msg)?,
        AgentMessage::Credential(msg) => to_object(msg)?,
        AgentMessage::PresentationProposal(msg) => to_object(msg)?,
        AgentMessage::PresentationRequest(msg) => to_object(msg)?,
        AgentMessage::Presentation(msg) => to_object(msg)?,
        AgentMessage::Unknown(raw) => return Ok(raw.clone()),
    };

    if let Some(msg_type) = aries_type(message) {
        object.insert("@type".to_string(), Value::String(msg_type.to_string()));
    }

    Ok(Value::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::messages::connection::Invitation;
    use crate::messages::notification::AckStatus;
    use crate::messages::types::MessageKind;

    #[test]
    fn test_decode_aries_kinds() {
        let table = vec![
            (
                json!({
                    "@type": "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/invitation",
                    "@id": "inv-1",
                    "label": "alice",
                    "recipientKeys": ["key"],
                    "serviceEndpoint": "https://alice.example.com"
                }),
                MessageKind::ConnectionInvitation,
            ),
            (
                json!({
                    "@type": "https://didcomm.org/trust_ping/1.0/ping",
                    "@id": "ping-1",
                    "response_requested": true
                }),
                MessageKind::Ping,
            ),
            (
                json!({
                    "@type": "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/issue-credential/1.0/ack",
                    "@id": "ack-1",
                    "status": "OK",
                    "~thread": {"thid": "offer-1"}
                }),
                MessageKind::Ack,
            ),
            (
                json!({
                    "@type": "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/problem_report",
                    "@id": "report-1",
                    "~thread": {"thid": "request-1"},
                    "comment": "rejected"
                }),
                MessageKind::ProblemReport,
            ),
            (
                json!({
                    "@type": "https://didcomm.org/some-protocol/1.0/some-message",
                    "@id": "x-1"
                }),
                MessageKind::Unknown,
            ),
            (
                json!({
                    "@type": "https://didcomm.org/connections/2.0/invitation",
                    "@id": "x-2"
                }),
                MessageKind::Unknown,
            ),
        ];

        for (input, expected) in table {
            let decoded = decode(&input.to_string()).unwrap();
            assert_eq!(decoded.protocol, ProtocolVariant::Aries);
            assert_eq!(decoded.kind(), expected, "{}", input);
        }
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let raw = json!({
            "@type": "https://didcomm.org/notification/1.0/ack",
            "@id": "ack-1",
            "status": "OK",
            "~thread": {"thid": "thread-1"},
            "~please_ack": {},
            "future_field": 42
        });

        let decoded = decode(&raw.to_string()).unwrap();
        match decoded.message {
            AgentMessage::Ack(ack) => {
                assert_eq!(ack.status, AckStatus::Ok);
                assert!(ack.thread.is_reply("thread-1"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_missing_required_field() {
        let raw = json!({
            "@type": "https://didcomm.org/connections/1.0/invitation",
            "@id": "inv-1",
            "label": "alice",
            "serviceEndpoint": "https://alice.example.com"
        });

        let err = decode(&raw.to_string()).unwrap_err();
        assert!(matches!(
            err,
            AgentError::MalformedMessage { ref field, .. } if field == "recipientKeys"
        ));
    }

    #[test]
    fn test_decode_invalid_envelopes() {
        let table = vec![
            ("not json", "message"),
            ("[1, 2]", "message"),
            (r#"{"@id": "1"}"#, "@type"),
            (r#"{"@type": 10}"#, "@type"),
            (r#"{"@type": "unknown:prefix/a/1.0/b"}"#, "@type"),
        ];

        for (input, expected) in table {
            let err = decode(input).unwrap_err();
            assert!(
                matches!(err, AgentError::MalformedMessage { ref field, .. } if field == expected),
                "{}: {:?}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_encode_aries() {
        let invitation = AgentMessage::ConnectionInvitation(Invitation {
            id: "inv-1".to_string(),
            label: "alice".to_string(),
            recipient_keys: vec!["key".to_string()],
            routing_keys: vec![],
            service_endpoint: "https://alice.example.com".to_string(),
        });

        let raw = encode(ProtocolVariant::Aries, &invitation, &Addressing::default()).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value["@type"],
            "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/invitation"
        );
        assert_eq!(value["recipientKeys"], json!(["key"]));

        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded.message, invitation);
    }

    #[test]
    fn test_unknown_message_preserves_content() {
        let raw = json!({
            "@type": "https://didcomm.org/custom/1.0/hello",
            "@id": "custom-1",
            "payload": {"nested": true}
        });

        let decoded = decode(&raw.to_string()).unwrap();
        assert_eq!(decoded.message.id().as_deref(), Some("custom-1"));

        let encoded = encode(ProtocolVariant::Aries, &decoded.message, &Addressing::default()).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, raw);
    }
}
