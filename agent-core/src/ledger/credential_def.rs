use chrono::{DateTime, Utc};
use rstdev_domain::BaseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::capability::crypto::RevocationConfig;
use crate::capability::{Capabilities, ResourceKind};
use crate::types::{AgentError, EntityAccessor, ProtocolVariant, ToJSON};

use super::{read_str, State};

/// `CredentialDef` is the credential definition an issuer offers credentials for
///
/// The revocation registry is optional, when present every issued credential records its
/// revocation information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialDef {
    source_id: String,
    cred_def_id: String,

    #[serde(default)]
    schema_id: String,

    #[serde(default)]
    tag: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    revocation: Option<RevocationConfig>,

    data: Value,
    created_at: DateTime<Utc>,
}

impl CredentialDef {
    pub async fn lookup(
        caps: &Capabilities,
        source_id: &str,
        cred_def_id: &str,
        revocation: Option<RevocationConfig>,
    ) -> Result<Self, AgentError> {
        if cred_def_id.is_empty() {
            return Err(AgentError::InvalidInput(
                "empty credential definition id".to_string(),
            ));
        }

        if let Some(config) = &revocation {
            if config.rev_reg_id.is_empty() {
                return Err(AgentError::InvalidInput(
                    "empty revocation registry id".to_string(),
                ));
            }
        }

        let data = caps
            .ledger
            .resolve(ResourceKind::CredentialDefinition, cred_def_id, &caps.cache)
            .await?;

        debug!("[credential_def:{}] resolved {}", source_id, cred_def_id);
        Ok(Self {
            source_id: source_id.to_string(),
            cred_def_id: cred_def_id.to_string(),
            schema_id: read_str(&data, &["schemaId", "schema_id"]).unwrap_or_default(),
            tag: read_str(&data, &["tag"]).unwrap_or_default(),
            revocation,
            data,
            created_at: Utc::now(),
        })
    }

    pub fn get_cred_def_id(&self) -> String {
        self.cred_def_id.clone()
    }

    pub fn get_schema_id(&self) -> String {
        self.schema_id.clone()
    }

    pub fn get_tag(&self) -> String {
        self.tag.clone()
    }

    pub fn get_revocation(&self) -> Option<RevocationConfig> {
        self.revocation.clone()
    }

    pub fn get_data(&self) -> Value {
        self.data.clone()
    }
}

impl ToJSON for CredentialDef {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl EntityAccessor for CredentialDef {
    type State = State;

    fn get_source_id(&self) -> String {
        self.source_id.clone()
    }

    fn get_state(&self) -> State {
        State::Resolved
    }

    fn get_protocol(&self) -> ProtocolVariant {
        ProtocolVariant::default()
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn get_updated_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn is_failed(&self) -> bool {
        false
    }
}
