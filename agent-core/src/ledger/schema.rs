use chrono::{DateTime, Utc};
use rstdev_domain::BaseError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::capability::{Capabilities, ResourceKind};
use crate::types::{AgentError, EntityAccessor, ProtocolVariant, ToJSON};

use super::{read_str, State};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    source_id: String,
    schema_id: String,
    name: String,
    version: String,

    #[serde(default)]
    attr_names: Vec<String>,

    data: Value,
    created_at: DateTime<Utc>,
}

impl Schema {
    /// `lookup` resolves the schema published under `schema_id`
    pub async fn lookup(
        caps: &Capabilities,
        source_id: &str,
        schema_id: &str,
    ) -> Result<Self, AgentError> {
        if schema_id.is_empty() {
            return Err(AgentError::InvalidInput("empty schema id".to_string()));
        }

        let data = caps
            .ledger
            .resolve(ResourceKind::Schema, schema_id, &caps.cache)
            .await?;

        let attr_names = data
            .get("attrNames")
            .or_else(|| data.get("attr_names"))
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        debug!("[schema:{}] resolved {}", source_id, schema_id);
        Ok(Self {
            source_id: source_id.to_string(),
            schema_id: schema_id.to_string(),
            name: read_str(&data, &["name"]).unwrap_or_default(),
            version: read_str(&data, &["version"]).unwrap_or_default(),
            attr_names,
            data,
            created_at: Utc::now(),
        })
    }

    pub fn get_schema_id(&self) -> String {
        self.schema_id.clone()
    }

    pub fn get_attr_names(&self) -> Vec<String> {
        self.attr_names.clone()
    }

    /// `get_attributes` is the public view of the schema
    pub fn get_attributes(&self) -> Value {
        json!({
            "source_id": self.source_id,
            "schema_id": self.schema_id,
            "name": self.name,
            "version": self.version,
            "attr_names": self.attr_names,
            "data": self.data,
        })
    }
}

impl ToJSON for Schema {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl EntityAccessor for Schema {
    type State = State;

    fn get_source_id(&self) -> String {
        self.source_id.clone()
    }

    fn get_state(&self) -> State {
        State::Resolved
    }

    fn get_protocol(&self) -> ProtocolVariant {
        ProtocolVariant::default()
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn get_updated_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn is_failed(&self) -> bool {
        false
    }
}
