use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::AgentError;

pub const MIME_TYPE_JSON: &str = "application/json";

/// `AttachmentData` keeps the attached payload in its wire encoding
///
/// The payload is never decoded while the message itself is decoded, only the consumer that needs
/// the content calls [`Attachment::content`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttachmentData {
    #[serde(rename = "base64")]
    Base64(String),

    #[serde(rename = "json")]
    Json(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "mime-type", default = "default_mime_type")]
    pub mime_type: String,

    pub data: AttachmentData,
}

fn default_mime_type() -> String {
    MIME_TYPE_JSON.to_string()
}

impl Attachment {
    pub fn from_json(id: &str, content: &Value) -> Self {
        Self {
            id: id.to_string(),
            mime_type: default_mime_type(),
            data: AttachmentData::Base64(STANDARD.encode(content.to_string())),
        }
    }

    pub fn from_json_str(id: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            mime_type: default_mime_type(),
            data: AttachmentData::Base64(STANDARD.encode(content)),
        }
    }

    pub fn content_string(&self) -> Result<String, AgentError> {
        match &self.data {
            AttachmentData::Json(value) => Ok(value.to_string()),
            AttachmentData::Base64(encoded) => {
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|err| AgentError::malformed(&self.field(), err.to_string()))?;

                String::from_utf8(bytes)
                    .map_err(|err| AgentError::malformed(&self.field(), err.to_string()))
            }
        }
    }

    pub fn content_value(&self) -> Result<Value, AgentError> {
        match &self.data {
            AttachmentData::Json(value) => Ok(value.clone()),
            AttachmentData::Base64(_) => {
                let content = self.content_string()?;
                serde_json::from_str(&content).map_err(|err| AgentError::from_serde(err, &self.field()))
            }
        }
    }

    pub fn content<T: DeserializeOwned>(&self) -> Result<T, AgentError> {
        let value = self.content_value()?;
        serde_json::from_value(value).map_err(|err| AgentError::from_serde(err, &self.field()))
    }

    fn field(&self) -> String {
        format!("~attach[{}]", self.id)
    }
}

/// `Attachments` is the value of every `xxx~attach` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attachments(Vec<Attachment>);

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(attachment: Attachment) -> Self {
        Self(vec![attachment])
    }

    pub fn push(&mut self, attachment: Attachment) {
        self.0.push(attachment)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Attachment> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.0.iter()
    }

    /// `content_value` lazily decodes the first attachment
    pub fn content_value(&self, field: &str) -> Result<Value, AgentError> {
        self.first()
            .ok_or_else(|| AgentError::malformed(field, "attachment is empty"))?
            .content_value()
    }

    pub fn content<T: DeserializeOwned>(&self, field: &str) -> Result<T, AgentError> {
        self.first()
            .ok_or_else(|| AgentError::malformed(field, "attachment is empty"))?
            .content()
    }
}
