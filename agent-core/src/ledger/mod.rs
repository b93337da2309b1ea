//! `ledger` keeps the public objects resolved from the ledger behind their own handles
//!
//! Those objects are never written by the engine, they are looked up through the
//! [`crate::capability::LedgerBuilder`] with the cache policy of the given [`crate::capability::Capabilities`]
mod credential_def;
mod schema;

pub use credential_def::CredentialDef;
pub use schema::Schema;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ledger objects are immutable once resolved
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Resolved,
}

impl State {
    pub fn code(&self) -> u32 {
        1
    }
}

pub(crate) fn read_str(value: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}
