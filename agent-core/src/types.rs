use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use rstdev_domain::BaseError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `AgentError` is the single error taxonomy shared by every component of the engine
///
/// Each variant is reported back to the caller through the command continuation, it will
/// never be retried internally. Use [`AgentError::code`] to get the stable numeric code
/// of an error kind
#[derive(Debug, PartialEq, Error, Serialize, Deserialize, Clone)]
pub enum AgentError {
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("handle busy: {0}")]
    HandleBusy(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("action not supported: {0}")]
    ActionNotSupported(String),

    #[error("malformed message: field `{field}`: {reason}")]
    MalformedMessage { field: String, reason: String },

    #[error("resolution failed: {0}")]
    ResolutionFailed(String),

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("wallet failure: {0}")]
    WalletFailure(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl AgentError {
    pub fn malformed(field: &str, reason: impl Into<String>) -> Self {
        AgentError::MalformedMessage {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// `from_serde` maps a `serde_json` failure into [`AgentError::MalformedMessage`]
    ///
    /// When the failure is caused by a missing required field, the field name is extracted from
    /// the error message, otherwise the given `fallback_field` is used
    pub fn from_serde(err: serde_json::Error, fallback_field: &str) -> Self {
        let reason = err.to_string();
        let field = reason
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next())
            .unwrap_or(fallback_field)
            .to_string();

        AgentError::MalformedMessage { field, reason }
    }

    pub fn code(&self) -> u32 {
        match self {
            AgentError::InvalidHandle(_) => 1048,
            AgentError::HandleBusy(_) => 1070,
            AgentError::InvalidState(_) => 1081,
            AgentError::ActionNotSupported(_) => 1103,
            AgentError::MalformedMessage { .. } => 1016,
            AgentError::ResolutionFailed(_) => 1036,
            AgentError::VerificationFailed(_) => 1023,
            AgentError::TransportFailure(_) => 1010,
            AgentError::WalletFailure(_) => 1075,
            AgentError::InvalidInput(_) => 1007,
            AgentError::SerializationError(_) => 1050,
            AgentError::Unknown(_) => 1001,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::InvalidHandle(_) => "InvalidHandle",
            AgentError::HandleBusy(_) => "HandleBusy",
            AgentError::InvalidState(_) => "InvalidState",
            AgentError::ActionNotSupported(_) => "ActionNotSupported",
            AgentError::MalformedMessage { .. } => "MalformedMessage",
            AgentError::ResolutionFailed(_) => "ResolutionFailed",
            AgentError::VerificationFailed(_) => "VerificationFailed",
            AgentError::TransportFailure(_) => "TransportFailure",
            AgentError::WalletFailure(_) => "WalletFailure",
            AgentError::InvalidInput(_) => "InvalidInput",
            AgentError::SerializationError(_) => "SerializationError",
            AgentError::Unknown(_) => "Unknown",
        }
    }
}

/// `WalletError` is returned by the wallet capability
///
/// The engine needs to distinguish a missing or a duplicated record from a storage failure,
/// for example to keep the credential storage idempotent
#[derive(Debug, PartialEq, Error, Clone)]
pub enum WalletError {
    #[error("wallet record not found: {0}")]
    NotFound(String),

    #[error("wallet record already exists: {0}")]
    Duplicate(String),

    #[error("wallet failure: {0}")]
    Failure(String),
}

impl From<WalletError> for AgentError {
    fn from(value: WalletError) -> Self {
        AgentError::WalletFailure(value.to_string())
    }
}

/// `ProtocolVariant` identify the message family used by an entity through its whole lifecycle
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    Proprietary,

    #[default]
    Aries,
}

impl ProtocolVariant {
    /// `require_aries` guards operations that only exist in the Aries protocol family
    pub fn require_aries(&self, action: &str) -> Result<(), AgentError> {
        match self {
            ProtocolVariant::Aries => Ok(()),
            ProtocolVariant::Proprietary => Err(AgentError::ActionNotSupported(format!(
                "{} is only available for the aries protocol",
                action
            ))),
        }
    }
}

impl TryFrom<&str> for ProtocolVariant {
    type Error = AgentError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "aries" => Ok(ProtocolVariant::Aries),
            "proprietary" | "legacy" => Ok(ProtocolVariant::Proprietary),
            other => Err(AgentError::InvalidInput(format!(
                "unknown protocol variant: {}",
                other
            ))),
        }
    }
}

pub use rstdev_domain::entity::ToJSON;

impl From<BaseError> for AgentError {
    fn from(value: BaseError) -> Self {
        AgentError::SerializationError(value.to_string())
    }
}

pub trait FromJSON: Sized {
    fn from_json(json: &str) -> Result<Self, AgentError>;
}

impl<T> FromJSON for T
where
    T: DeserializeOwned + EntityAccessor,
{
    fn from_json(json: &str) -> Result<Self, AgentError> {
        serde_json::from_str(json).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

/// `EntityAccessor` is the base shape of every stateful protocol object
///
/// The serialized form of an entity is its complete snapshot, an entity rebuilt from it
/// will always have the same state and the same set of legal transitions
pub trait EntityAccessor: Clone + Debug + Send + Sync {
    type State: Clone + Debug + PartialEq;

    fn get_source_id(&self) -> String;
    fn get_state(&self) -> Self::State;
    fn get_protocol(&self) -> ProtocolVariant;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;

    /// `is_failed` tells if the entity reached its terminal `Error` state
    fn is_failed(&self) -> bool;
}
