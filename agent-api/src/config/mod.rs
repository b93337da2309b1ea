//! `config` loads the TOML configuration of the agent
//!
//! Every section can be omitted except `[agent]`, its `label` and `endpoint` are published in the
//! invitations and must always be set
mod agent;
pub use agent::Agent;

mod runtime;
pub use runtime::{Logging, Runtime};

mod config;
pub use config::AgentConfig;

mod parser;
pub use parser::Parser;
