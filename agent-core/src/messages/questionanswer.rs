use serde::{Deserialize, Serialize};

use super::connection::ConnectionSignature;
use super::thread::Thread;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "@id")]
    pub id: String,

    pub question_text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_detail: Option<String>,

    #[serde(default)]
    pub nonce: String,

    #[serde(default)]
    pub signature_required: bool,

    pub valid_responses: Vec<QuestionResponse>,

    #[serde(rename = "~timing", default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}

impl Question {
    pub fn is_valid_response(&self, response: &str) -> bool {
        self.valid_responses.iter().any(|valid| valid.text == response)
    }
}

/// `Answer` replies to a [`Question`], `response~sig` is set when the question requires a signature.
/// The signed data is the response text followed by the question nonce
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "@id")]
    pub id: String,

    pub response: String,

    #[serde(rename = "response~sig", default, skip_serializing_if = "Option::is_none")]
    pub response_sig: Option<ConnectionSignature>,

    #[serde(rename = "~timing", default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}
