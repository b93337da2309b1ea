use std::fmt;

use crate::types::AgentError;

pub const DID_SOV_PREFIX: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec";
pub const DIDCOMM_PREFIX: &str = "https://didcomm.org";

/// `MessageFamily` is the set of Aries protocol families understood by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageFamily {
    Connections,
    Notification,
    ReportProblem,
    TrustPing,
    DiscoveryFeatures,
    BasicMessage,
    OutOfBand,
    QuestionAnswer,
    CredentialIssuance,
    PresentProof,
}

impl MessageFamily {
    pub const ALL: [MessageFamily; 10] = [
        MessageFamily::Connections,
        MessageFamily::Notification,
        MessageFamily::ReportProblem,
        MessageFamily::TrustPing,
        MessageFamily::DiscoveryFeatures,
        MessageFamily::BasicMessage,
        MessageFamily::OutOfBand,
        MessageFamily::QuestionAnswer,
        MessageFamily::CredentialIssuance,
        MessageFamily::PresentProof,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MessageFamily::Connections => "connections",
            MessageFamily::Notification => "notification",
            MessageFamily::ReportProblem => "report-problem",
            MessageFamily::TrustPing => "trust_ping",
            MessageFamily::DiscoveryFeatures => "discover-features",
            MessageFamily::BasicMessage => "basicmessage",
            MessageFamily::OutOfBand => "out-of-band",
            MessageFamily::QuestionAnswer => "questionanswer",
            MessageFamily::CredentialIssuance => "issue-credential",
            MessageFamily::PresentProof => "present-proof",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            MessageFamily::OutOfBand => "1.1",
            _ => "1.0",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            MessageFamily::OutOfBand => DIDCOMM_PREFIX,
            _ => DID_SOV_PREFIX,
        }
    }

    /// `protocol_id` builds the identifier advertised through the discover-features protocol
    pub fn protocol_id(&self) -> String {
        format!("{}/{}/{}", self.prefix(), self.name(), self.version())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        MessageFamily::ALL
            .iter()
            .find(|family| family.name() == name)
            .copied()
    }
}

/// `MessageType` is the parsed form of an Aries `@type` URI
///
/// Format: `<prefix>/<family>/<version>/<name>`, the prefix is either the `did:sov` spec prefix
/// or the `https://didcomm.org` one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageType {
    pub prefix: String,
    pub family: String,
    pub version: String,
    pub name: String,
}

impl MessageType {
    pub fn build(family: MessageFamily, name: &str) -> Self {
        Self {
            prefix: family.prefix().to_string(),
            family: family.name().to_string(),
            version: family.version().to_string(),
            name: name.to_string(),
        }
    }

    pub fn parse(value: &str) -> Result<Self, AgentError> {
        let rest = [DID_SOV_PREFIX, DIDCOMM_PREFIX]
            .iter()
            .find_map(|prefix| {
                value
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(|rest| (prefix.to_string(), rest))
            })
            .ok_or_else(|| AgentError::malformed("@type", format!("unknown prefix: {}", value)))?;

        let (prefix, parts) = rest;
        let parts: Vec<&str> = parts.split('/').collect();
        match parts.as_slice() {
            [family, version, name] if !family.is_empty() && !name.is_empty() => Ok(Self {
                prefix,
                family: family.to_string(),
                version: version.to_string(),
                name: name.to_string(),
            }),
            _ => Err(AgentError::malformed(
                "@type",
                format!("expected <family>/<version>/<name>: {}", value),
            )),
        }
    }

    pub fn family(&self) -> Option<MessageFamily> {
        MessageFamily::from_name(&self.family)
    }

    /// `is_compatible` accepts every minor version of the family major version
    pub fn is_compatible(&self) -> bool {
        match self.family() {
            Some(family) => {
                let major = family.version().split('.').next().unwrap_or_default();
                self.version.split('.').next() == Some(major)
            }
            None => false,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.prefix, self.family, self.version, self.name
        )
    }
}

/// `supported_protocols` returns the protocols disclosed to a peer that match the given query
///
/// The query accepts a trailing `*` wildcard, `*` alone matches every protocol
pub fn supported_protocols(query: &str) -> Vec<String> {
    let prefix = query.trim_end_matches('*');
    MessageFamily::ALL
        .iter()
        .map(|family| family.protocol_id())
        .filter(|pid| pid.starts_with(prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_types() {
        let table = vec![
            (
                "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/invitation",
                Some(("connections", "1.0", "invitation")),
            ),
            (
                "https://didcomm.org/out-of-band/1.1/handshake-reuse",
                Some(("out-of-band", "1.1", "handshake-reuse")),
            ),
            ("did:example:123/connections/1.0/invitation", None),
            ("https://didcomm.org/connections/invitation", None),
        ];

        for (input, expected) in table {
            let parsed = MessageType::parse(input);
            match expected {
                Some((family, version, name)) => {
                    let parsed = parsed.unwrap();
                    assert_eq!(parsed.family, family);
                    assert_eq!(parsed.version, version);
                    assert_eq!(parsed.name, name);
                    assert_eq!(parsed.to_string(), input);
                }
                None => assert!(matches!(
                    parsed,
                    Err(AgentError::MalformedMessage { ref field, .. }) if field == "@type"
                )),
            }
        }
    }

    #[test]
    fn test_build_uses_family_prefix() {
        let msg_type = MessageType::build(MessageFamily::OutOfBand, "invitation");
        assert_eq!(
            msg_type.to_string(),
            "https://didcomm.org/out-of-band/1.1/invitation"
        );

        let msg_type = MessageType::build(MessageFamily::TrustPing, "ping");
        assert_eq!(
            msg_type.to_string(),
            "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/trust_ping/1.0/ping"
        );
    }

    #[test]
    fn test_version_compatibility() {
        let msg_type = MessageType::parse("https://didcomm.org/connections/1.3/request").unwrap();
        assert!(msg_type.is_compatible());

        let msg_type = MessageType::parse("https://didcomm.org/connections/2.0/request").unwrap();
        assert!(!msg_type.is_compatible());
    }

    #[test]
    fn test_supported_protocols_query() {
        assert_eq!(supported_protocols("*").len(), MessageFamily::ALL.len());

        let found = supported_protocols("did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/trust_ping*");
        assert_eq!(
            found,
            vec!["did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/trust_ping/1.0".to_string()]
        );

        assert!(supported_protocols("https://example.org/*").is_empty());
    }
}
