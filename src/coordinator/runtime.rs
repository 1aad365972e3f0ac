use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::group::GroupConfig;
use crate::error::{ConfigError, ConsumerGroupError, GroupError, Result};
use crate::monitoring::GroupMetrics;

use super::event::AssignmentChanged;
use super::rebalance::{GroupCoordinator, GroupSnapshot};

const COMMAND_CHANNEL_SIZE: usize = 100;
const EVENT_CHANNEL_SIZE: usize = 64;

pub enum GroupCommand {
    Join {
        member_id: String,
        response_tx: oneshot::Sender<std::result::Result<AssignmentChanged, ConsumerGroupError>>,
    },
    Leave {
        member_id: String,
        response_tx:
            oneshot::Sender<std::result::Result<Option<AssignmentChanged>, ConsumerGroupError>>,
    },
    Heartbeat {
        member_id: String,
        response_tx: oneshot::Sender<std::result::Result<(), ConsumerGroupError>>,
    },
    Describe {
        response_tx: oneshot::Sender<GroupSnapshot>,
    },
}

/// Owns one coordinator and serializes every mutation through a single task.
pub struct GroupRuntime {
    /// consumer group state machine
    coordinator: GroupCoordinator,

    /// commands from every handle
    command_rx: mpsc::Receiver<GroupCommand>,

    /// fan-out of stable assignments
    events_tx: broadcast::Sender<AssignmentChanged>,

    tick_interval: Duration,
    cancel: CancellationToken,
}

impl GroupRuntime {
    pub fn spawn(config: &GroupConfig) -> std::result::Result<GroupHandle, ConfigError> {
        let coordinator = GroupCoordinator::new(config)?;
        Ok(Self::spawn_with(coordinator, config.effective_tick_interval()))
    }

    pub fn spawn_with(coordinator: GroupCoordinator, tick_interval: Duration) -> GroupHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        let runtime = GroupRuntime {
            coordinator,
            command_rx,
            events_tx: events_tx.clone(),
            tick_interval,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(runtime.run());

        GroupHandle {
            command_tx,
            events_tx,
            cancel,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    async fn run(mut self) {
        info!(
            "[Runtime] Starting group '{}', session check every {:?}.",
            self.coordinator.group_id(),
            self.tick_interval
        );
        let mut session_check = tokio::time::interval(self.tick_interval);
        session_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break;
                }

                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => break,
                    }
                }

                _ = session_check.tick() => {
                    let now = Instant::now().into_std();
                    if let Some(changed) = self.coordinator.tick(now) {
                        self.publish(changed);
                    }
                }
            }
        }

        info!("[Runtime] Shutting down group '{}'.", self.coordinator.group_id());
    }

    fn handle_command(&mut self, command: GroupCommand) {
        let now = Instant::now().into_std();
        match command {
            GroupCommand::Join { member_id, response_tx } => {
                let result = self.coordinator.join(&member_id, now);
                if let Ok(changed) = &result {
                    self.publish(changed.clone());
                }
                let _ = response_tx.send(result);
            }
            GroupCommand::Leave { member_id, response_tx } => {
                let result = self.coordinator.leave(&member_id);
                if let Ok(Some(changed)) = &result {
                    self.publish(changed.clone());
                }
                let _ = response_tx.send(result);
            }
            GroupCommand::Heartbeat { member_id, response_tx } => {
                let result = self.coordinator.heartbeat(&member_id, now);
                if let Err(e) = &result {
                    warn!("[Runtime] Rejected heartbeat: {}", e);
                }
                let _ = response_tx.send(result);
            }
            GroupCommand::Describe { response_tx } => {
                let _ = response_tx.send(self.coordinator.snapshot());
            }
        }
    }

    fn publish(&self, changed: AssignmentChanged) {
        if self.events_tx.send(changed).is_err() {
            debug!("[Runtime] No subscribers for assignment events.");
        }
    }
}

/// Cloneable front door to a running [`GroupRuntime`].
#[derive(Clone)]
pub struct GroupHandle {
    command_tx: mpsc::Sender<GroupCommand>,
    events_tx: broadcast::Sender<AssignmentChanged>,
    cancel: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl GroupHandle {
    pub async fn join(&self, member_id: &str) -> Result<AssignmentChanged> {
        let member_id = member_id.to_string();
        Ok(self
            .request(|response_tx| GroupCommand::Join { member_id, response_tx })
            .await??)
    }

    pub async fn leave(&self, member_id: &str) -> Result<Option<AssignmentChanged>> {
        let member_id = member_id.to_string();
        Ok(self
            .request(|response_tx| GroupCommand::Leave { member_id, response_tx })
            .await??)
    }

    pub async fn heartbeat(&self, member_id: &str) -> Result<()> {
        let member_id = member_id.to_string();
        Ok(self
            .request(|response_tx| GroupCommand::Heartbeat { member_id, response_tx })
            .await??)
    }

    pub async fn describe(&self) -> Result<GroupSnapshot> {
        self.request(|response_tx| GroupCommand::Describe { response_tx })
            .await
    }

    pub async fn metrics(&self) -> Result<GroupMetrics> {
        Ok(self.describe().await?.metrics)
    }

    /// Receives every assignment installed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AssignmentChanged> {
        self.events_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.command_tx.is_closed()
    }

    /// Stops the session check, refuses further commands and waits for the
    /// runtime task to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("[Runtime] Group task ended abnormally: {}", e);
            }
        }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> GroupCommand) -> Result<T> {
        if self.cancel.is_cancelled() {
            return Err(GroupError::Closed);
        }
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(command(response_tx))
            .await
            .map_err(|_| GroupError::Closed)?;
        response_rx.await.map_err(|_| GroupError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::assignment::AssignmentStrategy;
    use crate::coordinator::group::GroupState;

    fn config() -> GroupConfig {
        GroupConfig::new("user-actions", 6)
            .with_strategy(AssignmentStrategy::Range)
            .with_session_timeout(Duration::from_secs(3))
    }

    #[tokio::test(start_paused = true)]
    async fn commands_are_applied_in_order() {
        let handle = GroupRuntime::spawn(&config()).unwrap();
        let mut events = handle.subscribe();

        assert_eq!(handle.join("c1").await.unwrap().generation, 1);
        assert_eq!(handle.join("c2").await.unwrap().generation, 2);
        assert!(matches!(
            handle.join("c2").await,
            Err(GroupError::Group(ConsumerGroupError::AlreadyMember(_)))
        ));

        assert_eq!(events.recv().await.unwrap().generation, 1);
        assert_eq!(events.recv().await.unwrap().generation, 2);

        let snapshot = handle.describe().await.unwrap();
        assert_eq!(snapshot.state, GroupState::Stable);
        assert_eq!(snapshot.assignment.len(), 2);

        let metrics = handle.metrics().await.unwrap();
        assert_eq!(metrics.joins, 2);
        assert_eq!(metrics.rebalances, 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn silent_member_is_evicted_by_the_session_check() {
        let handle = GroupRuntime::spawn(&config()).unwrap();
        let mut events = handle.subscribe();

        handle.join("c1").await.unwrap();
        handle.join("c2").await.unwrap();
        events.recv().await.unwrap();
        events.recv().await.unwrap();

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.heartbeat("c2").await.unwrap();
        }

        let changed = events.recv().await.unwrap();
        assert_eq!(changed.generation, 3);
        assert!(changed.left.contains("c1"));
        assert_eq!(changed.assignment.member_ids().collect::<Vec<_>>(), vec!["c2"]);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_rejects_later_commands() {
        let handle = GroupRuntime::spawn(&config()).unwrap();
        let other = handle.clone();

        handle.shutdown().await;
        assert!(other.is_closed());
        assert!(matches!(other.join("c1").await, Err(GroupError::Closed)));
        assert!(matches!(other.describe().await, Err(GroupError::Closed)));
    }

    #[tokio::test]
    async fn invalid_config_does_not_spawn() {
        let config = GroupConfig::new("user-actions", 0);
        assert!(GroupRuntime::spawn(&config).is_err());
    }
}
