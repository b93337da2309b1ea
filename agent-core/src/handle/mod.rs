//! `handle` provides the opaque handle allocator and object store used for every entity category
//!
//! Each [`HandleRegistry`] owns the objects of exactly one [`Category`]. The registry applies a
//! single writer per handle policy: an operation that mutates an entity holds the entity's own lock
//! for the whole transition, concurrent operations on the same handle wait for it, and operations
//! on other handles never wait. Synchronous accessors never wait, they fail fast with
//! `AgentError::HandleBusy` while a transition is in flight.
pub mod types;
pub use types::{Category, Handle};

mod registry;
pub use registry::{HandleRegistry, Outcome};
