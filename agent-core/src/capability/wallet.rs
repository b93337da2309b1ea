use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::WalletError;

pub const RECORD_TYPE_CREDENTIAL: &str = "credential";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOptions {
    #[serde(rename = "retrieveType", default)]
    pub retrieve_type: bool,

    #[serde(rename = "retrieveValue", default = "default_true")]
    pub retrieve_value: bool,

    #[serde(rename = "retrieveTags", default)]
    pub retrieve_tags: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            retrieve_type: false,
            retrieve_value: true,
            retrieve_tags: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub id: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

/// `WalletBuilder` is the record store consumed by the engine
///
/// Records are addressed by a type and an id, values are opaque strings. `add` on an existing
/// record must fail with [`WalletError::Duplicate`], reading a missing record must fail with
/// [`WalletError::NotFound`]
#[async_trait]
pub trait WalletBuilder: Send + Sync {
    async fn add(
        &self,
        record_type: &str,
        id: &str,
        value: &str,
        tags: Option<HashMap<String, String>>,
    ) -> Result<(), WalletError>;

    async fn get(
        &self,
        record_type: &str,
        id: &str,
        options: &RecordOptions,
    ) -> Result<WalletRecord, WalletError>;

    async fn update_value(&self, record_type: &str, id: &str, value: &str)
        -> Result<(), WalletError>;

    async fn update_tags(
        &self,
        record_type: &str,
        id: &str,
        tags: HashMap<String, String>,
    ) -> Result<(), WalletError>;

    async fn delete(&self, record_type: &str, id: &str) -> Result<(), WalletError>;

    /// `open_search` returns the wallet own search handle
    async fn open_search(
        &self,
        record_type: &str,
        query: &Value,
        options: &RecordOptions,
    ) -> Result<u32, WalletError>;

    async fn search_next(&self, search_handle: u32, count: usize)
        -> Result<Vec<WalletRecord>, WalletError>;

    async fn close_search(&self, search_handle: u32) -> Result<(), WalletError>;

    async fn close(&self) -> Result<(), WalletError>;
}
