use serde::{Deserialize, Serialize};

use super::thread::Thread;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "@id")]
    pub id: String,

    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolDescriptor {
    pub pid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Disclose {
    #[serde(rename = "@id")]
    pub id: String,

    pub protocols: Vec<ProtocolDescriptor>,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}
