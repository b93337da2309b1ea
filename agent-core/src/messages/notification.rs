use serde::{Deserialize, Serialize};

use super::thread::Thread;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckStatus {
    #[default]
    #[serde(rename = "OK")]
    Ok,

    #[serde(rename = "FAIL")]
    Fail,

    #[serde(rename = "PENDING")]
    Pending,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(rename = "@id")]
    pub id: String,

    pub status: AckStatus,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
}

/// `ProblemReport` is used both for the generic `report-problem` message and for the
/// problem reports adopted by a protocol family. The legacy `REJECT` message decodes into it too
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemReport {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "~thread", default)]
    pub thread: Thread,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ProblemReport {
    pub fn reason(&self) -> String {
        self.comment
            .clone()
            .or_else(|| {
                self.description
                    .as_ref()
                    .map(|desc| desc.en.clone().unwrap_or_else(|| desc.code.clone()))
            })
            .unwrap_or_default()
    }
}
