use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use log::debug;

use crate::coordinator::event::AssignmentChanged;
use crate::coordinator::rebalance::GroupCoordinator;
use crate::error::ConsumerGroupError;

use super::ScenarioStep;

/// Drives a coordinator through [`ScenarioStep`]s on a manual clock.
///
/// Live members heartbeat every `session_timeout / 3`, the same cadence a
/// real consumer uses by default; crashed members stay silent until the
/// session check evicts them.
#[derive(Debug)]
pub struct Scenario {
    now: Instant,
    crashed: BTreeSet<String>,
}

impl Scenario {
    pub fn new(start: Instant) -> Self {
        Self {
            now: start,
            crashed: BTreeSet::new(),
        }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn apply(
        &mut self,
        coordinator: &mut GroupCoordinator,
        step: &ScenarioStep,
    ) -> Result<Vec<AssignmentChanged>, ConsumerGroupError> {
        match step {
            ScenarioStep::Start(member_id) => {
                let changed = coordinator.join(member_id, self.now)?;
                self.crashed.remove(member_id);
                Ok(vec![changed])
            }
            ScenarioStep::Stop(member_id) => {
                let changed = coordinator.leave(member_id)?;
                self.crashed.remove(member_id);
                Ok(changed.into_iter().collect())
            }
            ScenarioStep::Crash(member_id) => {
                if !coordinator.is_member(member_id) {
                    return Err(ConsumerGroupError::NotMember(member_id.clone()));
                }
                self.crashed.insert(member_id.clone());
                Ok(Vec::new())
            }
            ScenarioStep::Advance(duration) => Ok(self.advance(coordinator, *duration)),
            ScenarioStep::Status => Ok(Vec::new()),
        }
    }

    /// Runs every step, stopping at the first membership error.
    pub fn run(
        &mut self,
        coordinator: &mut GroupCoordinator,
        steps: &[ScenarioStep],
    ) -> Result<Vec<AssignmentChanged>, ConsumerGroupError> {
        let mut changes = Vec::new();
        for step in steps {
            changes.extend(self.apply(coordinator, step)?);
        }
        Ok(changes)
    }

    fn advance(&mut self, coordinator: &mut GroupCoordinator, duration: Duration) -> Vec<AssignmentChanged> {
        let interval = (coordinator.session_timeout() / 3).max(Duration::from_millis(1));
        let target = self.now + duration;
        let mut changes = Vec::new();

        while self.now < target {
            self.now = (self.now + interval).min(target);

            let live: Vec<String> = coordinator
                .members()
                .map(|m| m.id.clone())
                .filter(|id| !self.crashed.contains(id))
                .collect();
            for member_id in live {
                if let Err(e) = coordinator.heartbeat(&member_id, self.now) {
                    debug!("[Scenario] Heartbeat for '{}' failed: {}", member_id, e);
                }
            }

            if let Some(changed) = coordinator.tick(self.now) {
                for member_id in &changed.left {
                    self.crashed.remove(member_id);
                }
                changes.push(changed);
            }
        }
        self.crashed.retain(|id| coordinator.is_member(id));
        changes
    }
}
