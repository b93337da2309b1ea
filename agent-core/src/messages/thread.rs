use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `Thread` is the `~thread` decorator used to correlate the messages of a single protocol run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pthid: Option<String>,

    #[serde(default)]
    pub sender_order: u32,

    #[serde(default)]
    pub received_orders: HashMap<String, u32>,
}

impl Thread {
    pub fn new(thid: impl Into<String>) -> Self {
        Self {
            thid: Some(thid.into()),
            ..Default::default()
        }
    }

    pub fn with_pthid(mut self, pthid: Option<String>) -> Self {
        self.pthid = pthid;
        self
    }

    pub fn increment_sender_order(mut self) -> Self {
        self.sender_order += 1;
        self
    }

    pub fn increment_receiver(&mut self, did: &str) {
        self.received_orders
            .entry(did.to_string())
            .and_modify(|order| *order += 1)
            .or_insert(0);
    }

    pub fn is_reply(&self, id: &str) -> bool {
        self.thid.as_deref() == Some(id)
    }
}
