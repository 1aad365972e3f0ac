use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::coordinator::assignment::Assignment;
use crate::error::consumer::ConsumerGroupError;

use super::ConsumerMember;

/// Active members of one group, keyed by client id.
///
/// The registry owns liveness data only; which partitions a member holds is
/// written by the coordinator through [`MembershipRegistry::install`].
#[derive(Debug, Default)]
pub struct MembershipRegistry {
    members: BTreeMap<String, ConsumerMember>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(
        &mut self,
        member_id: &str,
        generation: u32,
        now: Instant,
    ) -> Result<(), ConsumerGroupError> {
        if self.members.contains_key(member_id) {
            return Err(ConsumerGroupError::AlreadyMember(member_id.to_string()));
        }
        info!("[Registry] Adding member '{}' (generation {}).", member_id, generation);
        self.members.insert(
            member_id.to_string(),
            ConsumerMember::new(member_id.to_string(), generation, now),
        );
        Ok(())
    }

    pub fn leave(&mut self, member_id: &str) -> Result<ConsumerMember, ConsumerGroupError> {
        let member = self
            .members
            .remove(member_id)
            .ok_or_else(|| ConsumerGroupError::NotMember(member_id.to_string()))?;
        info!("[Registry] Removed member '{}'.", member_id);
        Ok(member)
    }

    pub fn heartbeat(&mut self, member_id: &str, now: Instant) -> Result<(), ConsumerGroupError> {
        let member = self
            .members
            .get_mut(member_id)
            .ok_or_else(|| ConsumerGroupError::NotMember(member_id.to_string()))?;
        member.last_heartbeat = now;
        Ok(())
    }

    /// Removes and returns every member whose last heartbeat is older than
    /// `session_timeout`.
    pub fn evict_expired(&mut self, now: Instant, session_timeout: Duration) -> BTreeSet<String> {
        let expired: BTreeSet<String> = self
            .members
            .values()
            .filter(|m| m.is_expired(now, session_timeout))
            .map(|m| m.id.clone())
            .collect();

        for member_id in &expired {
            self.members.remove(member_id);
        }
        if !expired.is_empty() {
            info!("[Registry] Session timeout for members: {:?}", expired);
        }
        expired
    }

    /// Writes the partitions of `assignment` into each member and stamps
    /// them with `generation`.
    pub(crate) fn install(&mut self, assignment: &Assignment, generation: u32) {
        for member in self.members.values_mut() {
            member.generation = generation;
            member.assignment = assignment
                .partitions_of(&member.id)
                .cloned()
                .unwrap_or_default();
        }
        debug!("[Registry] Installed generation {} for {} members.", generation, self.members.len());
    }

    /// Earliest instant at which some member will be considered expired.
    pub fn next_deadline(&self, session_timeout: Duration) -> Option<Instant> {
        self.members.values().map(|m| m.deadline(session_timeout)).min()
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }

    pub fn get(&self, member_id: &str) -> Option<&ConsumerMember> {
        self.members.get(member_id)
    }

    pub fn contains(&self, member_id: &str) -> bool {
        self.members.contains_key(member_id)
    }

    pub fn members(&self) -> impl Iterator<Item = &ConsumerMember> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::metadata::TopicPartition;

    const SESSION: Duration = Duration::from_secs(10);

    #[test]
    fn join_rejects_duplicate_ids() {
        let now = Instant::now();
        let mut registry = MembershipRegistry::new();
        registry.join("c1", 1, now).unwrap();

        assert_eq!(
            registry.join("c1", 1, now),
            Err(ConsumerGroupError::AlreadyMember("c1".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn leave_and_heartbeat_require_membership() {
        let now = Instant::now();
        let mut registry = MembershipRegistry::new();

        assert_eq!(
            registry.leave("ghost").unwrap_err(),
            ConsumerGroupError::NotMember("ghost".to_string())
        );
        assert_eq!(
            registry.heartbeat("ghost", now),
            Err(ConsumerGroupError::NotMember("ghost".to_string()))
        );

        registry.join("c1", 1, now).unwrap();
        let member = registry.leave("c1").unwrap();
        assert_eq!(member.id, "c1");
        assert!(registry.is_empty());
    }

    #[test]
    fn evicts_only_members_past_the_session_timeout() {
        let start = Instant::now();
        let mut registry = MembershipRegistry::new();
        registry.join("c1", 1, start).unwrap();
        registry.join("c2", 1, start).unwrap();

        registry.heartbeat("c2", start + Duration::from_secs(8)).unwrap();

        // Exactly at the timeout nobody is expired yet.
        assert!(registry.evict_expired(start + SESSION, SESSION).is_empty());

        let evicted = registry.evict_expired(start + Duration::from_secs(11), SESSION);
        assert_eq!(evicted, BTreeSet::from(["c1".to_string()]));
        assert_eq!(registry.member_ids(), vec!["c2".to_string()]);
        assert_eq!(
            registry.next_deadline(SESSION),
            Some(start + Duration::from_secs(18))
        );
    }

    #[test]
    fn install_stamps_generation_and_partitions() {
        let now = Instant::now();
        let mut registry = MembershipRegistry::new();
        registry.join("c1", 1, now).unwrap();
        registry.join("c2", 1, now).unwrap();

        let mut assignment = Assignment::with_members(&["c1", "c2"]);
        assignment.insert("c1", TopicPartition::new("t", 0));

        registry.install(&assignment, 4);
        let c1 = registry.get("c1").unwrap();
        assert_eq!(c1.generation, 4);
        assert_eq!(c1.assignment.len(), 1);
        assert!(registry.get("c2").unwrap().assignment.is_empty());
    }
}
