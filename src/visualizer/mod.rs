//! Text rendering of installed assignments.
//!
//! Rendering is a pure function of an [`Assignment`]; the visualizer only
//! remembers the last view it produced.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::common::metadata::TopicPartition;
use crate::coordinator::assignment::Assignment;
use crate::coordinator::event::AssignmentChanged;

const BAR: &str = "██";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRow {
    pub member_id: String,
    pub partition_count: usize,
    pub partitions: Vec<TopicPartition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentView {
    pub generation: u32,
    pub joined: BTreeSet<String>,
    pub left: BTreeSet<String>,
    pub rows: Vec<MemberRow>,
}

/// Rows sorted by member id, partitions ascending.
pub fn render(assignment: &Assignment) -> Vec<MemberRow> {
    assignment
        .iter()
        .map(|(member_id, partitions)| MemberRow {
            member_id: member_id.clone(),
            partition_count: partitions.len(),
            partitions: partitions.iter().cloned().collect(),
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct AssignmentVisualizer {
    last: Option<AssignmentView>,
}

impl AssignmentVisualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, changed: &AssignmentChanged) -> &AssignmentView {
        self.last.insert(AssignmentView {
            generation: changed.generation,
            joined: changed.joined.clone(),
            left: changed.left.clone(),
            rows: render(&changed.assignment),
        })
    }

    pub fn last(&self) -> Option<&AssignmentView> {
        self.last.as_ref()
    }

    /// Forgets the last view, e.g. after the group emptied.
    pub fn clear(&mut self) {
        self.last = None;
    }
}

impl fmt::Display for MemberRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let partitions: Vec<String> = self.partitions.iter().map(|tp| tp.to_string()).collect();
        write!(
            f,
            "{}: {} ({} partitions) [{}]",
            self.member_id,
            BAR.repeat(self.partition_count),
            self.partition_count,
            partitions.join(", ")
        )
    }
}

impl fmt::Display for AssignmentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generation {}", self.generation)?;
        if !self.joined.is_empty() {
            write!(f, " | joined: {}", join_ids(&self.joined))?;
        }
        if !self.left.is_empty() {
            write!(f, " | left: {}", join_ids(&self.left))?;
        }
        if self.rows.is_empty() {
            return write!(f, "\n  (no members)");
        }
        for row in &self.rows {
            write!(f, "\n  {}", row)?;
        }
        Ok(())
    }
}

fn join_ids(ids: &BTreeSet<String>) -> String {
    ids.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
