use rstdev_config::format::use_toml;
use rstdev_config::parser::from_file;
use rstdev_config::{types::ConfigError, Builder};
use tracing::debug;

use crate::common::helpers;
use crate::common::types::CommonError;

use super::AgentConfig;

pub struct Parser {
    conf_file: String,
}

impl Parser {
    pub fn new(conf_file: String) -> Self {
        Self { conf_file }
    }

    /// `parse` reads and validates the configuration file
    pub fn parse(&self) -> Result<AgentConfig, CommonError> {
        let config = self.load().map_err(|err| {
            CommonError::ConfigError(format!("unable to load {}: {}", self.conf_file, err))
        })?;

        helpers::validate(&config)?;
        debug!("configuration loaded from {}", self.conf_file);
        Ok(config)
    }

    /// `parse_str` validates a configuration given as TOML content
    pub fn parse_str(content: &str) -> Result<AgentConfig, CommonError> {
        let config: AgentConfig =
            toml::from_str(content).map_err(|err| CommonError::ConfigError(err.to_string()))?;

        helpers::validate(&config)?;
        Ok(config)
    }

    fn load(&self) -> Result<AgentConfig, ConfigError> {
        Builder::new(from_file(self.conf_file.to_owned()))
            .fetch()?
            .parse(use_toml)
    }
}
