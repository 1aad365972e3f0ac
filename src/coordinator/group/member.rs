use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::common::metadata::TopicPartition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerMember {
    pub id: String,
    /// Generation of the last assignment this member took part in, or the
    /// pending generation while its join is being resolved.
    pub generation: u32,
    pub last_heartbeat: Instant,
    pub assignment: BTreeSet<TopicPartition>,
}

impl ConsumerMember {
    pub fn new(id: String, generation: u32, now: Instant) -> Self {
        Self {
            id,
            generation,
            last_heartbeat: now,
            assignment: BTreeSet::new(),
        }
    }

    pub fn is_expired(&self, now: Instant, session_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_heartbeat) > session_timeout
    }

    pub fn deadline(&self, session_timeout: Duration) -> Instant {
        self.last_heartbeat + session_timeout
    }
}
