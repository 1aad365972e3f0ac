use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;

use super::assignment::Assignment;

/// Inbound membership events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEvent {
    Join(String),
    Leave(String),
    Heartbeat(String),
    Tick(Instant),
}

/// Emitted every time the group settles into a new stable assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentChanged {
    pub generation: u32,
    pub assignment: Assignment,
    pub joined: BTreeSet<String>,
    pub left: BTreeSet<String>,
}
