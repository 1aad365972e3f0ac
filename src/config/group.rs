use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::metadata::PartitionCatalog;
use crate::coordinator::assignment::AssignmentStrategy;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub name: String,
    pub partitions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default = "default_group_id")]
    pub group_id: String,

    #[serde(with = "humantime_serde", default = "default_session_timeout")]
    pub session_timeout: Duration,

    /// How often expired members are checked. Defaults to a third of the
    /// session timeout.
    #[serde(with = "humantime_serde", default)]
    pub tick_interval: Option<Duration>,

    #[serde(default)]
    pub strategy: AssignmentStrategy,

    pub topics: Vec<TopicConfig>,
}

fn default_group_id() -> String {
    "visual-demo-group".to_string()
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(10)
}

impl GroupConfig {
    pub fn new(topic: &str, partitions: u32) -> Self {
        Self {
            group_id: default_group_id(),
            session_timeout: default_session_timeout(),
            tick_interval: None,
            strategy: AssignmentStrategy::default(),
            topics: vec![TopicConfig {
                name: topic.to_string(),
                partitions,
            }],
        }
    }

    pub fn with_strategy(mut self, strategy: AssignmentStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_session_timeout(mut self, session_timeout: Duration) -> Self {
        self.session_timeout = session_timeout;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = Some(tick_interval);
        self
    }

    /// Checks the configuration and builds the partition catalog it describes.
    pub fn validate(&self) -> Result<PartitionCatalog, ConfigError> {
        if self.session_timeout.is_zero() {
            return Err(ConfigError::InvalidConfiguration(
                "session_timeout must be positive".to_string(),
            ));
        }
        if matches!(self.tick_interval, Some(interval) if interval.is_zero()) {
            return Err(ConfigError::InvalidConfiguration(
                "tick_interval must be positive".to_string(),
            ));
        }
        PartitionCatalog::from_topics(&self.topics)
    }

    pub fn effective_tick_interval(&self) -> Duration {
        self.tick_interval
            .unwrap_or(self.session_timeout / 3)
            .max(Duration::from_millis(1))
    }
}
