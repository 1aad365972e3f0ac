use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::group::TopicConfig;
use crate::error::ConfigError;

/// A single partition of a topic.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: u32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: u32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

/// Ordered, de-duplicated set of partitions a group consumes.
///
/// The catalog is fixed once the group is configured; assignors receive
/// its partitions in sorted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionCatalog {
    partitions: Vec<TopicPartition>,
}

impl PartitionCatalog {
    pub fn single(topic: &str, partition_count: u32) -> Result<Self, ConfigError> {
        Self::from_topics(&[TopicConfig {
            name: topic.to_string(),
            partitions: partition_count,
        }])
    }

    pub fn from_topics(topics: &[TopicConfig]) -> Result<Self, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut partitions = Vec::new();

        for topic in topics {
            if topic.name.trim().is_empty() {
                return Err(ConfigError::InvalidConfiguration(
                    "topic name must not be empty".to_string(),
                ));
            }
            if !seen.insert(topic.name.as_str()) {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "topic '{}' is listed more than once",
                    topic.name
                )));
            }
            partitions.extend((0..topic.partitions).map(|i| TopicPartition::new(&topic.name, i)));
        }

        if partitions.is_empty() {
            return Err(ConfigError::InvalidConfiguration(
                "a group needs at least one partition".to_string(),
            ));
        }

        partitions.sort();
        Ok(Self { partitions })
    }

    pub fn partitions(&self) -> &[TopicPartition] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn contains(&self, tp: &TopicPartition) -> bool {
        self.partitions.binary_search(tp).is_ok()
    }

    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.partitions.iter().map(|tp| tp.topic.as_str()).collect();
        topics.dedup();
        topics
    }
}
