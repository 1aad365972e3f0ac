pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod monitoring;
pub mod scenario;
pub mod visualizer;

pub use common::metadata::{PartitionCatalog, TopicPartition};
pub use config::{Config, GroupConfig};
pub use coordinator::{
    Assignment, AssignmentChanged, AssignmentStrategy, GroupCoordinator, GroupEvent, GroupHandle,
    GroupRuntime, GroupState, PartitionAssignor,
};
pub use error::{ConfigError, ConsumerGroupError, GroupError};
