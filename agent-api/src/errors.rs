//! `errors` keeps the last error reported on the calling thread
//!
//! The detail is updated right before a continuation fires with an error, and whenever a
//! synchronous operation fails. Callers read it from the same thread through [`get_current_error`]
use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use prople_agent_core::types::AgentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: u32,
    pub kind: String,
    pub message: String,
}

impl From<&AgentError> for ErrorDetail {
    fn from(err: &AgentError) -> Self {
        Self {
            code: err.code(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

thread_local! {
    static CURRENT_ERROR: RefCell<Option<ErrorDetail>> = const { RefCell::new(None) };
}

pub fn set_current_error(err: &AgentError) {
    CURRENT_ERROR.with(|current| {
        *current.borrow_mut() = Some(ErrorDetail::from(err));
    })
}

pub fn reset_current_error() {
    CURRENT_ERROR.with(|current| {
        *current.borrow_mut() = None;
    })
}

pub fn current_error() -> Option<ErrorDetail> {
    CURRENT_ERROR.with(|current| current.borrow().clone())
}

/// `get_current_error` returns the last error of the calling thread as a JSON object
pub fn get_current_error() -> Option<String> {
    current_error().and_then(|detail| serde_json::to_string(&detail).ok())
}

/// `track` records the error of a synchronous operation before handing the result back
pub fn track<T>(result: Result<T, AgentError>) -> Result<T, AgentError> {
    if let Err(err) = &result {
        set_current_error(err);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    #[test]
    fn test_current_error_is_per_thread() {
        reset_current_error();
        assert!(get_current_error().is_none());

        let result: Result<(), AgentError> =
            track(Err(AgentError::InvalidHandle("connection 10".to_string())));
        assert!(result.is_err());

        let detail = current_error().unwrap();
        assert_eq!(detail.code, 1048);
        assert_eq!(detail.kind, "InvalidHandle");
        assert_eq!(detail.message, "invalid handle: connection 10");

        let other = thread::spawn(get_current_error).join().unwrap();
        assert!(other.is_none());

        let json: serde_json::Value = serde_json::from_str(&get_current_error().unwrap()).unwrap();
        assert_eq!(json["code"], 1048);
    }

    #[test]
    fn test_track_success_keeps_previous_error() {
        set_current_error(&AgentError::InvalidState("error".to_string()));
        assert_eq!(track(Ok::<u32, AgentError>(1)).unwrap(), 1);
        assert_eq!(current_error().unwrap().kind, "InvalidState");
    }
}
