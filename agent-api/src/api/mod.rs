//! `api` is the command surface of the agent, grouped by entity category
//!
//! Every state changing operation takes a correlation token and a continuation. It returns as
//! soon as the command is queued, the continuation is invoked later, exactly once, on a worker
//! thread. Accessors that never touch the network run synchronously and fail fast with
//! `AgentError::HandleBusy` while a transition owns the handle.
use std::sync::Arc;

use crate::context::Context;

pub mod connection;
pub mod credential;
pub mod credential_def;
pub mod disclosed_proof;
pub mod issuer_credential;
pub mod proof;
pub mod schema;
pub mod wallet_search;

pub use connection::ConnectionApi;
pub use credential::CredentialApi;
pub use credential_def::CredentialDefApi;
pub use disclosed_proof::DisclosedProofApi;
pub use issuer_credential::IssuerCredentialApi;
pub use proof::ProofApi;
pub use schema::SchemaApi;
pub use wallet_search::WalletSearchApi;

impl Context {
    pub fn connection(self: &Arc<Self>) -> ConnectionApi {
        ConnectionApi::new(self.clone())
    }

    pub fn issuer_credential(self: &Arc<Self>) -> IssuerCredentialApi {
        IssuerCredentialApi::new(self.clone())
    }

    pub fn credential(self: &Arc<Self>) -> CredentialApi {
        CredentialApi::new(self.clone())
    }

    pub fn proof(self: &Arc<Self>) -> ProofApi {
        ProofApi::new(self.clone())
    }

    pub fn disclosed_proof(self: &Arc<Self>) -> DisclosedProofApi {
        DisclosedProofApi::new(self.clone())
    }

    pub fn schema(self: &Arc<Self>) -> SchemaApi {
        SchemaApi::new(self.clone())
    }

    pub fn credential_def(self: &Arc<Self>) -> CredentialDefApi {
        CredentialDefApi::new(self.clone())
    }

    pub fn wallet_search(self: &Arc<Self>) -> WalletSearchApi {
        WalletSearchApi::new(self.clone())
    }
}
