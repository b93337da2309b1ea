use std::time::Duration;

use serde::Deserialize;

use crate::common::types::{CommonError, ToValidate};

#[derive(Deserialize, Debug, Clone)]
pub struct Runtime {
    #[serde(default = "default_worker_threads")]
    pub(super) worker_threads: usize,

    #[serde(default)]
    pub(super) command_timeout_secs: Option<u64>,
}

fn default_worker_threads() -> usize {
    4
}

impl Runtime {
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// `command_timeout` is absent when no dispatcher timeout is configured, `0` means the same
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            command_timeout_secs: None,
        }
    }
}

impl ToValidate for Runtime {
    fn validate(&self) -> Result<(), CommonError> {
        if self.worker_threads == 0 {
            return Err(CommonError::ValidationError(
                "config: runtime:worker_threads must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Logging {
    #[serde(default = "default_level")]
    pub(super) level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Logging {
    pub fn level(&self) -> String {
        self.level.to_owned()
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}
