//! `connection` establishes and maintains a pairwise channel with a single peer
//!
//! An inviter creates an invitation and waits for a request, an invitee receives the invitation
//! and sends its request. Both sides reach `Completed` once the handshake succeeded, from there the
//! channel is used by the credential and proof exchanges and by the side channel messages
//! (trust ping, discover features, question answer, basic message, handshake reuse).
mod connection;
pub mod types;

pub use connection::Connection;
pub use types::{
    deliver, Actor, CompletedConnection, ConnectionEntityAccessor, InvitationPayload, Peer, Route,
    State,
};
