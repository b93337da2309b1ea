use serde::Deserialize;

use prople_agent_core::capability::AgentProfile;
use prople_agent_core::types::ProtocolVariant;

use crate::common::types::{CommonError, ToValidate};

#[derive(Deserialize, Debug, Clone)]
pub struct Agent {
    #[serde(default)]
    pub(super) label: String,

    #[serde(default)]
    pub(super) endpoint: String,

    #[serde(default)]
    pub(super) routing_keys: Vec<String>,

    #[serde(default = "default_protocol")]
    pub(super) default_protocol: String,
}

fn default_protocol() -> String {
    "aries".to_string()
}

impl Agent {
    pub fn profile(&self) -> AgentProfile {
        AgentProfile {
            label: self.label.to_owned(),
            endpoint: self.endpoint.to_owned(),
            routing_keys: self.routing_keys.to_owned(),
        }
    }

    pub fn protocol(&self) -> Result<ProtocolVariant, CommonError> {
        ProtocolVariant::try_from(self.default_protocol.as_str())
            .map_err(|err| CommonError::ValidationError(err.to_string()))
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            label: "".to_string(),
            endpoint: "".to_string(),
            routing_keys: vec![],
            default_protocol: default_protocol(),
        }
    }
}

impl ToValidate for Agent {
    fn validate(&self) -> Result<(), CommonError> {
        if self.label.is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:label is missing".to_string(),
            ));
        }

        if self.endpoint.is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:endpoint is missing".to_string(),
            ));
        }

        self.protocol()?;
        Ok(())
    }
}
