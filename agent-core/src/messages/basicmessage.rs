use serde::{Deserialize, Serialize};

use super::thread::Thread;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicMessage {
    #[serde(rename = "@id")]
    pub id: String,

    pub content: String,

    #[serde(default)]
    pub sent_time: String,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
}
