use tokio::sync::broadcast;

use crate::dao::models::MatchEntity;

/// Notifications emitted by the match lifecycle on state transitions,
/// carrying the affected match record.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// An awaiting match was correlated to a live match.
    GameStarted(MatchEntity),
    /// A playing match finished and its outcome was recorded.
    GameCompleted(MatchEntity),
    /// An awaiting match exceeded its tracking window and was deleted.
    AwaitingTimeout(MatchEntity),
    /// A match was already underway when first observed and was deleted.
    GameAlreadyStarted(MatchEntity),
}

impl LifecycleEvent {
    /// Stable event name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::GameStarted(_) => "GAME_STARTED",
            LifecycleEvent::GameCompleted(_) => "GAME_COMPLETED",
            LifecycleEvent::AwaitingTimeout(_) => "AWAITING_TIMEOUT",
            LifecycleEvent::GameAlreadyStarted(_) => "GAME_ALREADY_STARTED",
        }
    }

    /// The match record the event refers to.
    pub fn record(&self) -> &MatchEntity {
        match self {
            LifecycleEvent::GameStarted(record)
            | LifecycleEvent::GameCompleted(record)
            | LifecycleEvent::AwaitingTimeout(record)
            | LifecycleEvent::GameAlreadyStarted(record) => record,
        }
    }
}

/// Broadcast hub fanning out lifecycle events to in-process subscribers.
pub struct EventHub {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn emit(&self, event: LifecycleEvent) {
        let _ = self.sender.send(event);
    }
}
