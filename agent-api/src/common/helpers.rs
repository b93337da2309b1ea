use serde::de::DeserializeOwned;

use prople_agent_core::types::AgentError;

use super::types::{CommonError, ToValidate};

pub fn validate(validator: &impl ToValidate) -> Result<(), CommonError> {
    validator.validate()
}

/// `parse_json` reads a JSON argument given by the caller, a failure is an `InvalidInput`
pub fn parse_json<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T, AgentError> {
    serde_json::from_str(raw)
        .map_err(|err| AgentError::InvalidInput(format!("invalid {}: {}", name, err)))
}

/// `parse_optional_json` treats an empty argument as absent
pub fn parse_optional_json<T: DeserializeOwned>(
    name: &str,
    raw: Option<&str>,
) -> Result<Option<T>, AgentError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => parse_json(name, raw).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{json, Value};

    #[test]
    fn test_parse_json_arguments() {
        let value: Value = parse_json("values", r#"{"name": "alice"}"#).unwrap();
        assert_eq!(value, json!({"name": "alice"}));

        let err = parse_json::<Value>("values", "{name").unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(ref msg) if msg.starts_with("invalid values")));
    }

    #[test]
    fn test_parse_optional_json() {
        let table = vec![
            (None, None),
            (Some(""), None),
            (Some("  "), None),
            (Some("[1]"), Some(json!([1]))),
        ];

        for (input, expected) in table {
            let parsed: Option<Value> = parse_optional_json("proposal", input).unwrap();
            assert_eq!(parsed, expected, "{:?}", input);
        }
    }
}
