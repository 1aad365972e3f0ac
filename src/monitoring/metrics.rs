use serde::Serialize;

/// Running totals for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupMetrics {
    pub joins: u64,
    pub leaves: u64,
    pub evictions: u64,
    pub heartbeats: u64,
    pub rebalances: u64,
    /// Partitions that changed owner across all rebalances.
    pub partitions_moved: u64,
}

impl GroupMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_join(&mut self) {
        self.joins += 1;
    }

    pub fn record_leave(&mut self) {
        self.leaves += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_heartbeat(&mut self) {
        self.heartbeats += 1;
    }

    pub fn record_rebalance(&mut self, moved: usize) {
        self.rebalances += 1;
        self.partitions_moved += moved as u64;
    }

    /// Average number of partitions moved per rebalance.
    pub fn average_movement(&self) -> Option<f64> {
        if self.rebalances == 0 {
            return None;
        }
        Some(self.partitions_moved as f64 / self.rebalances as f64)
    }
}
