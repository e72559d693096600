use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Tracked roster member persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable internal identifier.
    pub id: Uuid,
    /// Display name on the game account, used to correlate completed-match
    /// participants back to tracked players.
    pub game_name: String,
    /// Account identifier handed out by the match provider.
    pub account_id: String,
    /// Identity of the owning chat user.
    pub chat_id: String,
    /// Display name of the owning chat user.
    pub chat_name: String,
    /// Server / region tag the account lives on.
    pub server: String,
    /// Completed matches counted for this player.
    pub games: u32,
    /// Completed matches won.
    pub wins: u32,
    /// Completed matches lost.
    pub losses: u32,
    /// Times the player correctly predicted their own loss.
    pub successful_lose_predictions: u32,
    /// Current ladder score; unbounded in both directions.
    pub ladder_score: i64,
}

/// Lifecycle status of a tracked match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Created locally, not yet correlated to a live match.
    Awaiting,
    /// Correlated to an in-progress external match.
    Playing,
    /// External match finished and the outcome was recorded.
    Completed,
    /// Dropped before completion (late tracking or timeout).
    Aborted,
}

/// Pre-match guess about the tracked side's outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    /// The tracked side will win.
    Win,
    /// The tracked side will lose.
    Fail,
}

/// Per-player sub-record inside a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchPlayerEntity {
    /// Internal id of the tracked player.
    pub player_id: Uuid,
    /// Whether this player ended up on the winning team. Unset until the
    /// match completes.
    pub winner: Option<bool>,
}

/// Tracked contest persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the record.
    pub id: Uuid,
    /// Identifier of the external match; absent while awaiting.
    pub external_id: Option<i64>,
    /// Current lifecycle status.
    pub status: MatchStatus,
    /// Creation timestamp, seconds since the Unix epoch.
    pub created_at: i64,
    /// Chat channel the tracking request came from.
    pub channel: String,
    /// Author-chosen outcome guess, set before the match starts.
    pub prediction: Option<Prediction>,
    /// Actual outcome for the tracked side, valid once completed.
    pub is_win: bool,
    /// Terminal flag; set when the outcome has been recorded.
    pub completed: bool,
    /// Server / region tag the match was played on.
    pub server: String,
    /// Tracked players participating in this match, in correlation order.
    pub players: Vec<MatchPlayerEntity>,
}

impl MatchEntity {
    /// Whether `player_id` already appears in the sub-records.
    pub fn tracks_player(&self, player_id: Uuid) -> bool {
        self.players.iter().any(|p| p.player_id == player_id)
    }
}
