//! `capability` defines the external collaborators consumed by the state machines
//!
//! The engine never owns a wallet, a ledger pool, a network client or the credential cryptography.
//! Callers implement these traits and inject them through [`Capabilities`].
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod crypto;
pub mod ledger;
pub mod transport;
pub mod wallet;

pub use crypto::CryptoBuilder;
pub use ledger::{CacheOptions, CachingResolver, LedgerBuilder, ResourceKind};
pub use transport::{InboundMessage, OutboundMessage, TransportBuilder};
pub use wallet::WalletBuilder;

/// `AgentProfile` is the public information of our own agent used to build invitations and
/// DID documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub label: String,
    pub endpoint: String,

    #[serde(default)]
    pub routing_keys: Vec<String>,
}

#[derive(Clone)]
pub struct Capabilities {
    pub wallet: Arc<dyn WalletBuilder>,
    pub ledger: Arc<dyn LedgerBuilder>,
    pub transport: Arc<dyn TransportBuilder>,
    pub crypto: Arc<dyn CryptoBuilder>,
    pub profile: AgentProfile,
    pub cache: CacheOptions,
}

impl Capabilities {
    pub fn new(
        wallet: Arc<dyn WalletBuilder>,
        ledger: Arc<dyn LedgerBuilder>,
        transport: Arc<dyn TransportBuilder>,
        crypto: Arc<dyn CryptoBuilder>,
        profile: AgentProfile,
    ) -> Self {
        Self {
            wallet,
            ledger,
            transport,
            crypto,
            profile,
            cache: CacheOptions::default(),
        }
    }

    pub fn with_cache(mut self, cache: CacheOptions) -> Self {
        self.cache = cache;
        self
    }
}
