use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::PlayerEntity;

/// Registration payload for a new tracked player.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterPlayerRequest {
    /// Display name on the game account.
    #[validate(length(min = 1, message = "game name must not be empty"))]
    pub game_name: String,
    /// Owning chat identity.
    #[validate(length(min = 1, message = "chat id must not be empty"))]
    pub chat_id: String,
    /// Owning chat display name.
    pub chat_name: String,
    /// Server tag; the configured default applies when absent.
    pub server: Option<String>,
}

/// Player as rendered by the API, with the resolved ladder title.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Stable internal identifier.
    pub id: Uuid,
    /// Display name on the game account.
    pub game_name: String,
    /// Owning chat identity.
    pub chat_id: String,
    /// Owning chat display name.
    pub chat_name: String,
    /// Server / region tag.
    pub server: String,
    /// Completed matches counted.
    pub games: u32,
    /// Completed matches won.
    pub wins: u32,
    /// Completed matches lost.
    pub losses: u32,
    /// Correctly predicted own losses.
    pub successful_lose_predictions: u32,
    /// Current ladder score.
    pub ladder_score: i64,
    /// Rank title the score resolves to; empty when no ladder is loaded.
    pub ladder_title: String,
}

impl PlayerSummary {
    /// Render a player with the title their score resolves to.
    pub fn new(player: PlayerEntity, ladder_title: Option<&str>) -> Self {
        Self {
            id: player.id,
            game_name: player.game_name,
            chat_id: player.chat_id,
            chat_name: player.chat_name,
            server: player.server,
            games: player.games,
            wins: player.wins,
            losses: player.losses,
            successful_lose_predictions: player.successful_lose_predictions,
            ladder_score: player.ladder_score,
            ladder_title: ladder_title.unwrap_or_default().to_owned(),
        }
    }
}
