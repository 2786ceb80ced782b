//! Fire-and-forget progress events for planning runs

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::models::PassagePlan;

/// Lifecycle event of one planning run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    PlanningStarted {
        request_id: Uuid,
    },
    AgentActive {
        request_id: Uuid,
        agent: String,
        status: String,
    },
    PlanningCompleted {
        request_id: Uuid,
        plan: Box<PassagePlan>,
    },
    PlanningError {
        request_id: Uuid,
        message: String,
    },
}

impl ProgressEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::PlanningStarted { .. } => "planning_started",
            ProgressEvent::AgentActive { .. } => "agent_active",
            ProgressEvent::PlanningCompleted { .. } => "planning_completed",
            ProgressEvent::PlanningError { .. } => "planning_error",
        }
    }
}

/// Publishes progress events without acknowledgment or delivery guarantee
pub trait ProgressBroadcaster: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBroadcaster;

impl ProgressBroadcaster for NullBroadcaster {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Broadcaster over a bounded tokio channel.
///
/// Subscribers that fall more than `capacity` events behind lose the oldest
/// ones; emitting never waits on them.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ChannelBroadcaster {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

impl ProgressBroadcaster for ChannelBroadcaster {
    fn emit(&self, event: ProgressEvent) {
        let name = event.name();
        // Err only means nobody is listening
        match self.sender.send(event) {
            Ok(receivers) => trace!(event = name, receivers, "Progress event sent"),
            Err(_) => trace!(event = name, "No progress subscribers"),
        }
    }
}
