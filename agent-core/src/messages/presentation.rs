use serde::{Deserialize, Serialize};

use super::attachment::Attachments;
use super::thread::Thread;

pub const PRESENTATION_PREVIEW_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/1.0/presentation-preview";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewAttribute {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,

    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewPredicate {
    pub name: String,
    pub cred_def_id: String,
    pub predicate: String,
    pub threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationPreview {
    #[serde(rename = "@type", default = "default_preview_type")]
    pub preview_type: String,

    #[serde(default)]
    pub attributes: Vec<PreviewAttribute>,

    #[serde(default)]
    pub predicates: Vec<PreviewPredicate>,
}

fn default_preview_type() -> String {
    PRESENTATION_PREVIEW_TYPE.to_string()
}

impl Default for PresentationPreview {
    fn default() -> Self {
        Self {
            preview_type: default_preview_type(),
            attributes: vec![],
            predicates: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentationProposal {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    pub presentation_proposal: PresentationPreview,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresentationRequest {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(rename = "request_presentations~attach")]
    pub request_presentations_attach: Attachments,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(rename = "presentations~attach")]
    pub presentations_attach: Attachments,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}
