use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{MatchEntity, MatchPlayerEntity, MatchStatus, Prediction};

/// Request body opening (or re-checking) a tracked match for a chat user.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterMatchRequest {
    /// Chat identity of the tracked player.
    #[validate(length(min = 1, message = "chat id must not be empty"))]
    pub chat_id: String,
    /// Chat channel the tracking request came from.
    pub channel: Option<String>,
}

/// Request body re-checking the open match for a chat user.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckMatchRequest {
    /// Chat identity of the tracked player.
    #[validate(length(min = 1, message = "chat id must not be empty"))]
    pub chat_id: String,
}

/// Request body changing the prediction on an open match.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PredictionRequest {
    /// Chat identity of the tracked player.
    #[validate(length(min = 1, message = "chat id must not be empty"))]
    pub chat_id: String,
    /// `true` predicts a win, `false` a loss.
    pub win: bool,
}

/// Paging parameters for the match listing.
#[derive(Debug, Deserialize, IntoParams)]
pub struct GamesQuery {
    /// Records to skip.
    pub offset: Option<u64>,
    /// Maximum records to return.
    pub limit: Option<u64>,
}

/// Per-player slice of a match as rendered by the API.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct GamePlayerSummary {
    /// Internal id of the tracked player.
    pub player_id: Uuid,
    /// Winner flag, present once the match completed.
    pub winner: Option<bool>,
}

impl From<MatchPlayerEntity> for GamePlayerSummary {
    fn from(sub: MatchPlayerEntity) -> Self {
        Self {
            player_id: sub.player_id,
            winner: sub.winner,
        }
    }
}

/// Tracked match as rendered by the API.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSummary {
    /// Primary key of the record.
    pub id: Uuid,
    /// External match id, present once correlated.
    pub external_id: Option<i64>,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Creation timestamp, seconds since the Unix epoch.
    pub created_at: i64,
    /// Chat channel the tracking request came from.
    pub channel: String,
    /// Author-chosen outcome guess.
    pub prediction: Option<Prediction>,
    /// Actual outcome for the tracked side, valid once completed.
    pub is_win: bool,
    /// Whether the outcome has been recorded.
    pub completed: bool,
    /// Server / region tag.
    pub server: String,
    /// Tracked players in this match.
    pub players: Vec<GamePlayerSummary>,
}

impl From<MatchEntity> for GameSummary {
    fn from(record: MatchEntity) -> Self {
        Self {
            id: record.id,
            external_id: record.external_id,
            status: record.status,
            created_at: record.created_at,
            channel: record.channel,
            prediction: record.prediction,
            is_win: record.is_win,
            completed: record.completed,
            server: record.server,
            players: record.players.into_iter().map(Into::into).collect(),
        }
    }
}
