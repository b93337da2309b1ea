use thiserror::Error;

use prople_agent_core::types::AgentError;

#[derive(Debug, PartialEq, Error)]
pub enum CommonError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("config error: {0}")]
    ConfigError(String),
}

impl From<CommonError> for AgentError {
    fn from(value: CommonError) -> Self {
        AgentError::InvalidInput(value.to_string())
    }
}

pub trait ToValidate {
    fn validate(&self) -> Result<(), CommonError>;
}
