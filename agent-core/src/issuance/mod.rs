//! `issuance` implements both roles of the credential exchange
//!
//! The `Issuer` offers a credential of a given credential definition and issues it once the
//! `Holder` requested it. The `Holder` receives the offer, requests the credential and stores it
//! into its wallet. Both roles talk through a [`crate::connection::CompletedConnection`].
mod holder;
mod issuer;
pub mod types;

pub use holder::Holder;
pub use issuer::Issuer;
pub use types::{HolderState, IssuerState, RevocationInfo};
