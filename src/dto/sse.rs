use serde::Serialize;
use utoipa::ToSchema;

use crate::{dto::game::GameSummary, state::LifecycleEvent};

/// Dispatched payload carried on the SSE stream.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// Event name (one of the lifecycle event names).
    pub event: String,
    /// JSON-serialized payload.
    pub data: String,
}

impl ServerEvent {
    /// Render a lifecycle event into its wire form.
    pub fn from_lifecycle(event: &LifecycleEvent) -> serde_json::Result<Self> {
        let payload = MatchEventPayload {
            game: event.record().clone().into(),
        };
        Ok(Self {
            event: event.name().to_owned(),
            data: serde_json::to_string(&payload)?,
        })
    }
}

/// Payload carried by every lifecycle event: the affected match.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchEventPayload {
    /// The match the event refers to.
    pub game: GameSummary,
}
