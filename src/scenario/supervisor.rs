use std::collections::BTreeMap;
use std::time::Duration;

use log::{info, warn};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::coordinator::event::AssignmentChanged;
use crate::coordinator::runtime::GroupHandle;
use crate::error::{ConsumerGroupError, Result};

/// Stands in for a process manager: every started member gets a background
/// heartbeat loop against the group runtime.
pub struct MemberSupervisor {
    handle: GroupHandle,
    heartbeat_interval: Duration,
    heartbeats: BTreeMap<String, CancellationToken>,
}

impl MemberSupervisor {
    pub fn new(handle: GroupHandle, heartbeat_interval: Duration) -> Self {
        Self {
            handle,
            heartbeat_interval,
            heartbeats: BTreeMap::new(),
        }
    }

    pub async fn start(&mut self, member_id: &str) -> Result<AssignmentChanged> {
        let changed = self.handle.join(member_id).await?;

        let token = CancellationToken::new();
        tokio::spawn(heartbeat_loop(
            self.handle.clone(),
            member_id.to_string(),
            self.heartbeat_interval,
            token.clone(),
        ));
        if let Some(previous) = self.heartbeats.insert(member_id.to_string(), token) {
            previous.cancel();
        }

        info!("[Supervisor] Started consumer '{}'.", member_id);
        Ok(changed)
    }

    /// Graceful stop: heartbeats end and the member leaves the group.
    pub async fn stop(&mut self, member_id: &str) -> Result<Option<AssignmentChanged>> {
        if let Some(token) = self.heartbeats.remove(member_id) {
            token.cancel();
        }
        let changed = self.handle.leave(member_id).await?;
        info!("[Supervisor] Stopped consumer '{}'.", member_id);
        Ok(changed)
    }

    /// Hard stop: heartbeats end but the member never leaves, so only the
    /// session timeout removes it.
    pub fn crash(&mut self, member_id: &str) -> Result<()> {
        let token = self
            .heartbeats
            .remove(member_id)
            .ok_or_else(|| ConsumerGroupError::NotMember(member_id.to_string()))?;
        token.cancel();
        info!("[Supervisor] Consumer '{}' went silent.", member_id);
        Ok(())
    }

    pub fn running(&self) -> Vec<&str> {
        self.heartbeats.keys().map(String::as_str).collect()
    }

    pub fn handle(&self) -> &GroupHandle {
        &self.handle
    }

    /// Stops every running member, ignoring members the group already
    /// dropped.
    pub async fn stop_all(&mut self) {
        let running: Vec<String> = self.heartbeats.keys().cloned().collect();
        for member_id in running {
            if let Err(e) = self.stop(&member_id).await {
                warn!("[Supervisor] Could not stop '{}': {}", member_id, e);
            }
        }
    }
}

async fn heartbeat_loop(
    handle: GroupHandle,
    member_id: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = handle.heartbeat(&member_id).await {
                    warn!("[Supervisor] Heartbeat loop for '{}' ended: {}", member_id, e);
                    break;
                }
            }
        }
    }
}
