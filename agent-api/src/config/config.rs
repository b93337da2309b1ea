use serde::Deserialize;

use prople_agent_core::capability::CacheOptions;

use crate::common::types::{CommonError, ToValidate};

use super::{Agent, Logging, Runtime};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub(super) agent: Agent,

    #[serde(default)]
    pub(super) runtime: Runtime,

    #[serde(default)]
    pub(super) cache: CacheOptions,

    #[serde(default)]
    pub(super) logging: Logging,
}

impl AgentConfig {
    pub fn new(label: &str, endpoint: &str) -> Self {
        Self {
            agent: Agent {
                label: label.to_string(),
                endpoint: endpoint.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn cache(&self) -> &CacheOptions {
        &self.cache
    }

    pub fn logging(&self) -> &Logging {
        &self.logging
    }

    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.runtime.command_timeout_secs = Some(secs);
        self
    }
}

impl ToValidate for AgentConfig {
    fn validate(&self) -> Result<(), CommonError> {
        self.agent.validate()?;
        self.runtime.validate()?;

        Ok(())
    }
}
