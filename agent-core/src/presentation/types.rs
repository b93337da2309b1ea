use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::capability::{Capabilities, ResourceKind};
use crate::types::AgentError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProverState {
    Initial,
    ProposalSent,
    RequestReceived,
    Generated,
    Sent,
    Accepted,
    Rejected,
    Error,
}

impl ProverState {
    pub fn code(&self) -> u32 {
        match self {
            ProverState::Initial => 1,
            ProverState::ProposalSent => 2,
            ProverState::RequestReceived => 3,
            ProverState::Generated => 4,
            ProverState::Sent => 5,
            ProverState::Accepted => 6,
            ProverState::Rejected => 7,
            ProverState::Error => 8,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProverState::Accepted | ProverState::Rejected | ProverState::Error
        )
    }
}

/// Verifier side of the exchange
///
/// `PresentationReceived` only lasts while the received presentation is being verified, a
/// verifier at rest is either still waiting, `Verified` or terminated
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierState {
    Initial,
    ProposalReceived,
    RequestSent,
    PresentationReceived,
    Verified,
    Rejected,
    Error,
}

impl VerifierState {
    pub fn code(&self) -> u32 {
        match self {
            VerifierState::Initial => 1,
            VerifierState::ProposalReceived => 2,
            VerifierState::RequestSent => 3,
            VerifierState::PresentationReceived => 4,
            VerifierState::Verified => 5,
            VerifierState::Rejected => 7,
            VerifierState::Error => 8,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerifierState::Verified | VerifierState::Rejected | VerifierState::Error
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationResult {
    #[default]
    Undefined,
    Validated,
    Invalid,
}

impl VerificationResult {
    pub fn code(&self) -> u32 {
        match self {
            VerificationResult::Undefined => 0,
            VerificationResult::Validated => 1,
            VerificationResult::Invalid => 2,
        }
    }
}

/// `Identifiers` collects the public objects referenced by a proof
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identifiers {
    pub schema_ids: BTreeSet<String>,
    pub cred_def_ids: BTreeSet<String>,
}

impl Identifiers {
    /// `from_proof` reads the `identifiers` list of a proof, each entry must name both its schema
    /// and its credential definition
    pub fn from_proof(proof: &Value) -> Result<Self, AgentError> {
        let entries = proof
            .get("identifiers")
            .and_then(Value::as_array)
            .ok_or_else(|| AgentError::malformed("identifiers", "missing proof identifiers"))?;

        let mut identifiers = Self::default();
        for entry in entries {
            identifiers.insert(entry)?;
        }

        Ok(identifiers)
    }

    /// `from_selected_credentials` reads the `cred_info` of every credential selected by the prover
    pub fn from_selected_credentials(selected: &Value) -> Result<Self, AgentError> {
        let mut identifiers = Self::default();
        let attrs = match selected.get("attrs").and_then(Value::as_object) {
            Some(attrs) => attrs,
            None => return Ok(identifiers),
        };

        for (referent, selection) in attrs {
            let info = selection
                .pointer("/credential/cred_info")
                .or_else(|| selection.get("cred_info"))
                .ok_or_else(|| {
                    AgentError::InvalidInput(format!(
                        "selected credential without cred_info: {}",
                        referent
                    ))
                })?;

            identifiers
                .insert(info)
                .map_err(|err| AgentError::InvalidInput(err.to_string()))?;
        }

        Ok(identifiers)
    }

    fn insert(&mut self, entry: &Value) -> Result<(), AgentError> {
        let field = |name: &str| {
            entry
                .get(name)
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or_else(|| AgentError::malformed(&format!("identifiers.{}", name), "missing identifier"))
        };

        self.schema_ids.insert(field("schema_id")?);
        self.cred_def_ids.insert(field("cred_def_id")?);
        Ok(())
    }

    /// `resolve` looks every identifier up, any failure aborts the whole resolution. It returns
    /// the schemas and the credential definitions as JSON objects keyed by their identifier
    pub async fn resolve(&self, caps: &Capabilities) -> Result<(Value, Value), AgentError> {
        let schemas = Self::resolve_all(caps, ResourceKind::Schema, &self.schema_ids).await?;
        let cred_defs =
            Self::resolve_all(caps, ResourceKind::CredentialDefinition, &self.cred_def_ids).await?;

        Ok((schemas, cred_defs))
    }

    async fn resolve_all(
        caps: &Capabilities,
        kind: ResourceKind,
        ids: &BTreeSet<String>,
    ) -> Result<Value, AgentError> {
        let mut resolved = Map::new();
        for id in ids {
            debug!("[presentation] resolving {} {}", kind, id);
            let value = caps.ledger.resolve(kind, id, &caps.cache).await?;
            resolved.insert(id.clone(), value);
        }

        Ok(Value::Object(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_identifiers_from_proof() {
        let table = vec![
            (
                json!({"identifiers": [
                    {"schema_id": "s1", "cred_def_id": "c1"},
                    {"schema_id": "s1", "cred_def_id": "c2"}
                ]}),
                Some((1, 2)),
            ),
            (json!({"identifiers": [{"schema_id": "s1"}]}), None),
            (json!({"identifiers": [{"schema_id": "", "cred_def_id": "c1"}]}), None),
            (json!({}), None),
        ];

        for (input, expected) in table {
            let result = Identifiers::from_proof(&input);
            match expected {
                Some((schemas, cred_defs)) => {
                    let identifiers = result.unwrap();
                    assert_eq!(identifiers.schema_ids.len(), schemas);
                    assert_eq!(identifiers.cred_def_ids.len(), cred_defs);
                }
                None => assert!(matches!(result, Err(AgentError::MalformedMessage { .. }))),
            }
        }
    }

    #[test]
    fn test_identifiers_from_selected_credentials() {
        let selected = json!({"attrs": {
            "attribute_0": {"credential": {"cred_info": {"referent": "cred-1", "schema_id": "s1", "cred_def_id": "c1"}}},
            "attribute_1": {"cred_info": {"referent": "cred-2", "schema_id": "s2", "cred_def_id": "c1"}}
        }});

        let identifiers = Identifiers::from_selected_credentials(&selected).unwrap();
        assert_eq!(identifiers.schema_ids.len(), 2);
        assert_eq!(identifiers.cred_def_ids.len(), 1);

        let invalid = json!({"attrs": {"attribute_0": {"credential": {}}}});
        assert!(matches!(
            Identifiers::from_selected_credentials(&invalid),
            Err(AgentError::InvalidInput(_))
        ));
    }
}
