use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::AgentError;

use super::attachment::Attachments;
use super::thread::Thread;

pub const CREDENTIAL_PREVIEW_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/issue-credential/1.0/credential-preview";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialAttribute {
    pub name: String,

    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialPreview {
    #[serde(rename = "@type", default = "default_preview_type")]
    pub preview_type: String,

    #[serde(default)]
    pub attributes: Vec<CredentialAttribute>,
}

fn default_preview_type() -> String {
    CREDENTIAL_PREVIEW_TYPE.to_string()
}

impl Default for CredentialPreview {
    fn default() -> Self {
        Self {
            preview_type: default_preview_type(),
            attributes: vec![],
        }
    }
}

impl CredentialPreview {
    /// `from_values` accepts a JSON object mapping attribute names to their values
    pub fn from_values(values: &Value) -> Result<Self, AgentError> {
        let object = values
            .as_object()
            .ok_or_else(|| AgentError::InvalidInput("credential values must be a JSON object".to_string()))?;

        let attributes = object
            .iter()
            .map(|(name, value)| CredentialAttribute {
                name: name.clone(),
                mime_type: None,
                value: match value {
                    Value::String(value) => value.clone(),
                    other => other.to_string(),
                },
            })
            .collect();

        Ok(Self {
            preview_type: default_preview_type(),
            attributes,
        })
    }

    pub fn to_values(&self) -> Value {
        let values = self
            .attributes
            .iter()
            .map(|attr| (attr.name.clone(), Value::String(attr.value.clone())))
            .collect();

        Value::Object(values)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialProposal {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    pub credential_proposal: CredentialPreview,

    #[serde(default)]
    pub schema_id: String,

    #[serde(default)]
    pub cred_def_id: String,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialOffer {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    pub credential_preview: CredentialPreview,

    #[serde(rename = "offers~attach")]
    pub offers_attach: Attachments,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

impl CredentialOffer {
    /// `cred_def_id` reads the credential definition id from the attached offer
    pub fn cred_def_id(&self) -> Result<String, AgentError> {
        let offer = self.offers_attach.content_value("offers~attach")?;
        offer
            .get("cred_def_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AgentError::malformed("offers~attach.cred_def_id", "missing field"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialRequest {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(rename = "requests~attach")]
    pub requests_attach: Attachments,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(rename = "credentials~attach")]
    pub credentials_attach: Attachments,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}
