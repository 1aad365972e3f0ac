//! Partition assignment strategies.
//!
//! An assignor is a pure function from the sorted member ids and the sorted
//! partition catalog to an [`Assignment`]. For any non-empty member set the
//! result must cover every partition exactly once, and the number of
//! partitions per member may differ by at most one.

mod range;
mod round_robin;
mod sticky;

pub use range::RangeAssignor;
pub use round_robin::RoundRobinAssignor;
pub use sticky::StickyAssignor;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

use crate::common::metadata::TopicPartition;

pub struct AssignmentContext<'a> {
    /// Member ids in ascending order.
    pub members: &'a [String],
    /// Partitions in ascending order.
    pub partitions: &'a [TopicPartition],
    /// The assignment installed before this rebalance. Empty for a fresh group.
    pub previous: &'a Assignment,
}

pub trait PartitionAssignor: Send + Sync {
    fn assign(&self, context: &AssignmentContext) -> Assignment;
    fn name(&self) -> &str;
}

/// Built-in strategies selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    #[default]
    Range,
    #[serde(alias = "roundrobin")]
    RoundRobin,
    Sticky,
}

impl AssignmentStrategy {
    pub fn assignor(&self) -> Box<dyn PartitionAssignor> {
        match self {
            AssignmentStrategy::Range => Box::new(RangeAssignor),
            AssignmentStrategy::RoundRobin => Box::new(RoundRobinAssignor),
            AssignmentStrategy::Sticky => Box::new(StickyAssignor),
        }
    }
}

impl fmt::Display for AssignmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssignmentStrategy::Range => "range",
            AssignmentStrategy::RoundRobin => "roundrobin",
            AssignmentStrategy::Sticky => "sticky",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssignmentViolation {
    #[error("partition {0} is not assigned to any member")]
    Unassigned(TopicPartition),

    #[error("partition {0} is assigned to both '{1}' and '{2}'")]
    Overlap(TopicPartition, String, String),

    #[error("partition {0} is not part of the catalog")]
    UnknownPartition(TopicPartition),

    #[error("members hold between {min} and {max} partitions")]
    Unbalanced { min: usize, max: usize },
}

/// Mapping from member id to the partitions it owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Assignment {
    members: BTreeMap<String, BTreeSet<TopicPartition>>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an assignment where every member owns nothing yet.
    pub fn with_members<S: AsRef<str>>(members: &[S]) -> Self {
        Self {
            members: members
                .iter()
                .map(|m| (m.as_ref().to_string(), BTreeSet::new()))
                .collect(),
        }
    }

    pub fn insert(&mut self, member_id: &str, tp: TopicPartition) {
        self.members.entry(member_id.to_string()).or_default().insert(tp);
    }

    pub fn partitions_of(&self, member_id: &str) -> Option<&BTreeSet<TopicPartition>> {
        self.members.get(member_id)
    }

    pub fn owner_of(&self, tp: &TopicPartition) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, partitions)| partitions.contains(tp))
            .map(|(member_id, _)| member_id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<TopicPartition>)> {
        self.members.iter()
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn counts(&self) -> BTreeMap<&str, usize> {
        self.members
            .iter()
            .map(|(member_id, partitions)| (member_id.as_str(), partitions.len()))
            .collect()
    }

    pub fn is_balanced(&self) -> bool {
        let counts: Vec<usize> = self.members.values().map(BTreeSet::len).collect();
        match (counts.iter().min(), counts.iter().max()) {
            (Some(min), Some(max)) => max - min <= 1,
            _ => true,
        }
    }

    /// Checks full coverage, no overlap and the balance bound against the
    /// given catalog. An empty assignment is valid only for an empty group,
    /// which callers detect separately.
    pub fn validate(&self, partitions: &[TopicPartition]) -> Result<(), AssignmentViolation> {
        if self.members.is_empty() {
            return Ok(());
        }

        let mut owners: HashMap<&TopicPartition, &str> = HashMap::new();
        for (member_id, owned) in &self.members {
            for tp in owned {
                if let Some(other) = owners.insert(tp, member_id.as_str()) {
                    return Err(AssignmentViolation::Overlap(
                        tp.clone(),
                        other.to_string(),
                        member_id.clone(),
                    ));
                }
            }
        }

        let catalog: BTreeSet<&TopicPartition> = partitions.iter().collect();
        if let Some(unknown) = owners.keys().find(|tp| !catalog.contains(*tp)) {
            return Err(AssignmentViolation::UnknownPartition((*unknown).clone()));
        }
        if let Some(missing) = partitions.iter().find(|tp| !owners.contains_key(tp)) {
            return Err(AssignmentViolation::Unassigned(missing.clone()));
        }

        if !self.is_balanced() {
            let counts: Vec<usize> = self.members.values().map(BTreeSet::len).collect();
            return Err(AssignmentViolation::Unbalanced {
                min: counts.iter().copied().min().unwrap_or(0),
                max: counts.iter().copied().max().unwrap_or(0),
            });
        }

        Ok(())
    }

    /// Number of partitions that were owned in `previous` and now belong to
    /// a different member.
    pub fn movements_from(&self, previous: &Assignment) -> usize {
        previous
            .iter()
            .flat_map(|(member_id, owned)| owned.iter().map(move |tp| (member_id, tp)))
            .filter(|(member_id, tp)| {
                self.owner_of(tp)
                    .is_some_and(|owner| owner != member_id.as_str())
            })
            .count()
    }
}
