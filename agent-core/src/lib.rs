//! `prople-agent-core` is the protocol engine of the prople agent.
//!
//! It maintains the finite state models used by an agent to interact with its peers:
//!
//! - `connection`, a pairwise channel established through a handshake protocol
//! - `issuance`, the credential exchange between an `Issuer` and a `Holder`
//! - `presentation`, the proof exchange between a `Prover` and a `Verifier`
//!
//! ---
//!
//! Every entity lives behind an opaque [`handle::Handle`] owned by a [`handle::HandleRegistry`].
//! A registry serializes all mutations of the same handle through a per-object lock, while
//! different handles are never blocked by each other.
//!
//! Inbound and outbound protocol messages are translated by the [`messages`] codec. It supports two
//! message families living side by side: the legacy flat format identified by `msg_type` and `version`
//! and the Aries `DIDComm` format identified by an `@type` URI.
//!
//! ---
//!
//! The engine never talks to a wallet, a ledger or a network directly. Those are consumed through
//! the traits defined at [`capability`], and injected by the caller through a [`capability::Capabilities`]
//! object.
pub mod types;

pub mod capability;
pub mod handle;
pub mod inbound;
pub mod messages;

pub mod connection;
pub mod issuance;
pub mod ledger;
pub mod presentation;

#[cfg(test)]
pub(crate) mod testing;
