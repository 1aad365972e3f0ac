use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Serialize;

use crate::common::metadata::PartitionCatalog;
use crate::config::group::GroupConfig;
use crate::error::{ConfigError, ConsumerGroupError};
use crate::monitoring::GroupMetrics;

use super::assignment::{Assignment, AssignmentContext, PartitionAssignor};
use super::event::{AssignmentChanged, GroupEvent};
use super::group::{ConsumerMember, GroupState, MembershipRegistry};

/// Point-in-time view of a group, safe to hand out to readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSnapshot {
    pub group_id: String,
    pub state: GroupState,
    pub generation: u32,
    pub strategy: String,
    pub assignment: Assignment,
    pub metrics: GroupMetrics,
}

/// Eager rebalance state machine for a single consumer group.
///
/// Every membership change recomputes the full assignment and installs it
/// in one step, so callers only ever observe `Empty` or `Stable`.
pub struct GroupCoordinator {
    group_id: String,
    catalog: PartitionCatalog,
    session_timeout: Duration,
    assignor: Box<dyn PartitionAssignor>,
    registry: MembershipRegistry,
    state: GroupState,
    generation: u32,
    assignment: Assignment,
    metrics: GroupMetrics,
}

impl fmt::Debug for GroupCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupCoordinator")
            .field("group_id", &self.group_id)
            .field("strategy", &self.assignor.name())
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("members", &self.registry.len())
            .finish()
    }
}

impl GroupCoordinator {
    pub fn new(config: &GroupConfig) -> Result<Self, ConfigError> {
        Self::with_assignor(config, config.strategy.assignor())
    }

    pub fn with_assignor(
        config: &GroupConfig,
        assignor: Box<dyn PartitionAssignor>,
    ) -> Result<Self, ConfigError> {
        let catalog = config.validate()?;
        info!(
            "[Coordinator] Group '{}' created with {} partitions, strategy '{}'.",
            config.group_id,
            catalog.len(),
            assignor.name()
        );
        Ok(Self {
            group_id: config.group_id.clone(),
            catalog,
            session_timeout: config.session_timeout,
            assignor,
            registry: MembershipRegistry::new(),
            state: GroupState::Empty,
            generation: 0,
            assignment: Assignment::new(),
            metrics: GroupMetrics::new(),
        })
    }

    pub fn join(
        &mut self,
        member_id: &str,
        now: Instant,
    ) -> Result<AssignmentChanged, ConsumerGroupError> {
        let pending = self.next_generation();
        self.registry.join(member_id, pending, now)?;
        self.metrics.record_join();

        let joined = BTreeSet::from([member_id.to_string()]);
        Ok(self.install_next(joined, BTreeSet::new()))
    }

    /// Removes a member. Returns `None` when the group became empty.
    pub fn leave(&mut self, member_id: &str) -> Result<Option<AssignmentChanged>, ConsumerGroupError> {
        self.registry.leave(member_id)?;
        self.metrics.record_leave();
        info!("[Coordinator] Member '{}' left group '{}'.", member_id, self.group_id);

        let left = BTreeSet::from([member_id.to_string()]);
        Ok(self.rebalance(BTreeSet::new(), left))
    }

    pub fn heartbeat(&mut self, member_id: &str, now: Instant) -> Result<(), ConsumerGroupError> {
        self.registry.heartbeat(member_id, now)?;
        self.metrics.record_heartbeat();
        Ok(())
    }

    /// Evicts members whose session expired and rebalances once for all of
    /// them. Returns `None` when nobody expired or the group became empty.
    pub fn tick(&mut self, now: Instant) -> Option<AssignmentChanged> {
        let evicted = self.registry.evict_expired(now, self.session_timeout);
        if evicted.is_empty() {
            return None;
        }
        self.metrics.record_evictions(evicted.len());
        info!(
            "[Coordinator] Evicted {:?} from group '{}' after session timeout.",
            evicted, self.group_id
        );
        self.rebalance(BTreeSet::new(), evicted)
    }

    pub fn handle(
        &mut self,
        event: GroupEvent,
        now: Instant,
    ) -> Result<Option<AssignmentChanged>, ConsumerGroupError> {
        match event {
            GroupEvent::Join(member_id) => self.join(&member_id, now).map(Some),
            GroupEvent::Leave(member_id) => self.leave(&member_id),
            GroupEvent::Heartbeat(member_id) => self.heartbeat(&member_id, now).map(|_| None),
            GroupEvent::Tick(at) => Ok(self.tick(at)),
        }
    }

    fn next_generation(&self) -> u32 {
        self.generation + 1
    }

    fn rebalance(
        &mut self,
        joined: BTreeSet<String>,
        left: BTreeSet<String>,
    ) -> Option<AssignmentChanged> {
        if self.registry.is_empty() {
            debug!("[Coordinator] Group '{}' has no members left.", self.group_id);
            self.state = GroupState::Empty;
            self.assignment = Assignment::new();
            return None;
        }
        Some(self.install_next(joined, left))
    }

    /// Recomputes the assignment for the current, non-empty membership and
    /// installs it under the next generation.
    fn install_next(
        &mut self,
        joined: BTreeSet<String>,
        left: BTreeSet<String>,
    ) -> AssignmentChanged {
        self.state = GroupState::Rebalancing;

        let members = self.registry.member_ids();
        let next = self.assignor.assign(&AssignmentContext {
            members: &members,
            partitions: self.catalog.partitions(),
            previous: &self.assignment,
        });
        debug_assert_eq!(
            next.validate(self.catalog.partitions()),
            Ok(()),
            "assignor '{}' broke the assignment contract",
            self.assignor.name()
        );

        let moved = next.movements_from(&self.assignment);
        self.generation = self.next_generation();
        self.registry.install(&next, self.generation);
        self.assignment = next;
        self.metrics.record_rebalance(moved);
        self.state = GroupState::Stable;

        info!(
            "[Coordinator] Group '{}' stable at generation {} with {} members ({} partitions moved).",
            self.group_id,
            self.generation,
            members.len(),
            moved
        );

        AssignmentChanged {
            generation: self.generation,
            assignment: self.assignment.clone(),
            joined,
            left,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn catalog(&self) -> &PartitionCatalog {
        &self.catalog
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    pub fn members(&self) -> impl Iterator<Item = &ConsumerMember> {
        self.registry.members()
    }

    pub fn is_member(&self, member_id: &str) -> bool {
        self.registry.contains(member_id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.registry.next_deadline(self.session_timeout)
    }

    pub fn metrics(&self) -> GroupMetrics {
        self.metrics
    }

    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            group_id: self.group_id.clone(),
            state: self.state,
            generation: self.generation,
            strategy: self.assignor.name().to_string(),
            assignment: self.assignment.clone(),
            metrics: self.metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::assignment::AssignmentStrategy;

    fn coordinator(strategy: AssignmentStrategy) -> GroupCoordinator {
        let config = GroupConfig::new("user-actions", 6)
            .with_strategy(strategy)
            .with_session_timeout(Duration::from_secs(10));
        GroupCoordinator::new(&config).unwrap()
    }

    fn counts(changed: &AssignmentChanged) -> Vec<usize> {
        changed.assignment.counts().into_values().collect()
    }

    #[test]
    fn starts_empty_at_generation_zero() {
        let group = coordinator(AssignmentStrategy::Range);
        assert_eq!(group.state(), GroupState::Empty);
        assert_eq!(group.generation(), 0);
        assert!(group.assignment().is_empty());
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = GroupConfig::new("user-actions", 0);
        assert!(GroupCoordinator::new(&config).is_err());
    }

    #[test]
    fn join_leave_cycle_bumps_generation_each_time() {
        let now = Instant::now();
        let mut group = coordinator(AssignmentStrategy::Range);

        let changed = group.join("c1", now).unwrap();
        assert_eq!(changed.generation, 1);
        assert_eq!(counts(&changed), vec![6]);
        assert_eq!(changed.joined, BTreeSet::from(["c1".to_string()]));
        assert_eq!(group.state(), GroupState::Stable);

        let changed = group.join("c2", now).unwrap();
        assert_eq!(changed.generation, 2);
        assert_eq!(counts(&changed), vec![3, 3]);

        let changed = group.join("c3", now).unwrap();
        assert_eq!(changed.generation, 3);
        assert_eq!(counts(&changed), vec![2, 2, 2]);

        let changed = group.leave("c2").unwrap().unwrap();
        assert_eq!(changed.generation, 4);
        assert_eq!(counts(&changed), vec![3, 3]);
        assert_eq!(changed.left, BTreeSet::from(["c2".to_string()]));
        assert_eq!(changed.assignment.validate(group.catalog().partitions()), Ok(()));
    }

    #[test]
    fn duplicate_join_and_unknown_leave_fail_without_rebalancing() {
        let now = Instant::now();
        let mut group = coordinator(AssignmentStrategy::Range);
        group.join("c1", now).unwrap();

        assert_eq!(
            group.join("c1", now),
            Err(ConsumerGroupError::AlreadyMember("c1".to_string()))
        );
        assert_eq!(
            group.leave("c9"),
            Err(ConsumerGroupError::NotMember("c9".to_string()))
        );
        assert_eq!(group.generation(), 1);
        assert_eq!(group.metrics().rebalances, 1);
    }

    #[test]
    fn last_member_leaving_empties_the_group() {
        let now = Instant::now();
        let mut group = coordinator(AssignmentStrategy::RoundRobin);
        group.join("c1", now).unwrap();

        assert_eq!(group.leave("c1").unwrap(), None);
        assert_eq!(group.state(), GroupState::Empty);
        assert!(group.assignment().is_empty());

        // Generations keep counting up across an empty period.
        let changed = group.join("c1", now).unwrap();
        assert_eq!(changed.generation, 2);
    }

    #[test]
    fn tick_evicts_silent_members() {
        let start = Instant::now();
        let mut group = coordinator(AssignmentStrategy::Range);
        group.join("c1", start).unwrap();
        group.join("c2", start).unwrap();

        let later = start + Duration::from_secs(6);
        group.heartbeat("c2", later).unwrap();
        assert_eq!(group.tick(later), None);

        let changed = group.tick(start + Duration::from_secs(11)).unwrap();
        assert_eq!(changed.generation, 3);
        assert_eq!(changed.left, BTreeSet::from(["c1".to_string()]));
        assert_eq!(counts(&changed), vec![6]);
        assert!(!group.is_member("c1"));
        assert_eq!(group.metrics().evictions, 1);
    }

    #[test]
    fn handle_dispatches_events() {
        let now = Instant::now();
        let mut group = coordinator(AssignmentStrategy::Sticky);

        let changed = group.handle(GroupEvent::Join("c1".to_string()), now).unwrap();
        assert_eq!(changed.map(|c| c.generation), Some(1));
        assert_eq!(
            group.handle(GroupEvent::Heartbeat("c1".to_string()), now),
            Ok(None)
        );
        assert_eq!(
            group.handle(GroupEvent::Heartbeat("c2".to_string()), now),
            Err(ConsumerGroupError::NotMember("c2".to_string()))
        );
        assert_eq!(
            group.handle(GroupEvent::Tick(now + Duration::from_secs(20)), now),
            Ok(None)
        );
        assert_eq!(group.state(), GroupState::Empty);
    }

    #[test]
    fn members_share_the_installed_generation() {
        let now = Instant::now();
        let mut group = coordinator(AssignmentStrategy::Range);
        group.join("c1", now).unwrap();
        group.join("c2", now).unwrap();

        assert!(group.members().all(|m| m.generation == 2));
        let owned: usize = group.members().map(|m| m.assignment.len()).sum();
        assert_eq!(owned, 6);
    }

    #[test]
    fn snapshot_reports_strategy_and_metrics() {
        let now = Instant::now();
        let mut group = coordinator(AssignmentStrategy::Sticky);
        group.join("c1", now).unwrap();
        group.join("c2", now).unwrap();

        let snapshot = group.snapshot();
        assert_eq!(snapshot.strategy, "sticky");
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.metrics.joins, 2);
        assert_eq!(snapshot.metrics.partitions_moved, 3);
    }
}
