//! Queue Configuration Module
//!
//! Serializable settings for a sequential queue: its name, what happens when
//! the handler fails, and the size of the event channel.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use crate::queue::notifications::DEFAULT_EVENT_CAPACITY;

/// What the drain loop does after a handler failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and move on to the next item
    #[default]
    Continue,
    /// Drop the failing item and stop; remaining items stay pending
    Halt,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "halt" => Ok(FailurePolicy::Halt),
            _ => Err(format!("Invalid failure policy: {}. Valid options: continue, halt", s)),
        }
    }
}

/// Main queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Label used in logs, events and errors
    pub name: String,

    /// Handler failure behaviour
    pub failure_policy: FailurePolicy,

    /// Broadcast channel capacity for drain events
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "queue".to_string(),
            failure_policy: FailurePolicy::Continue,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl QueueConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Load queue configuration from TOML string
pub fn load_queue_config(toml_str: &str) -> Result<QueueConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Save queue configuration to TOML string
pub fn save_queue_config(config: &QueueConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}
