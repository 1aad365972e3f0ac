pub mod metadata;

pub use metadata::{PartitionCatalog, TopicPartition};
