//! `prople-agent-api` exposes the protocol engine of `prople-agent-core` through opaque handles
//!
//! A host application builds a [`Context`] from an [`config::AgentConfig`] and its own wallet,
//! ledger, transport and crypto implementations. Every command is queued on the context worker
//! pool and reports its result through a continuation invoked exactly once, the last error seen
//! by the calling thread stays readable through [`errors::get_current_error`].
pub mod api;
pub mod common;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod logging;

mod context;
pub use context::Context;

pub use prople_agent_core as core;
