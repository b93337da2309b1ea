use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// `Handle` is an opaque unsigned integer referencing an entity owned by a registry
///
/// Handles are allocated monotonically per [`Category`] and never reused, a released handle
/// stays invalid forever
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, From, Into, Display,
)]
pub struct Handle(u32);

impl Handle {
    pub fn value(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Category {
    Connection,
    Credential,
    IssuerCredential,
    DisclosedProof,
    Proof,
    Schema,
    CredentialDef,
    WalletSearch,
    WalletBackup,
}
