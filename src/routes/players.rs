use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::player::{PlayerSummary, RegisterPlayerRequest},
    error::AppError,
    services::lifecycle::{self, RegisterPlayer},
    state::SharedState,
};

/// Routes handling roster registration and listing.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/players", get(list_players))
        .route("/players", post(register_player))
}

/// List every tracked player with their resolved ladder title.
#[utoipa::path(
    get,
    path = "/players",
    tag = "players",
    responses(
        (status = 200, description = "Tracked players", body = [PlayerSummary])
    )
)]
pub async fn list_players(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    let players = lifecycle::get_all_players(&state).await?;
    let ladder = state.ladder().await;

    let summaries = players
        .into_iter()
        .map(|player| {
            let title = ladder.resolve(player.ladder_score);
            PlayerSummary::new(player, title)
        })
        .collect();
    Ok(Json(summaries))
}

/// Register a player for tracking, resolving their provider identity.
#[utoipa::path(
    post,
    path = "/players",
    tag = "players",
    request_body = RegisterPlayerRequest,
    responses(
        (status = 200, description = "Player registered", body = PlayerSummary),
        (status = 409, description = "Player already registered")
    )
)]
pub async fn register_player(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterPlayerRequest>>,
) -> Result<Json<PlayerSummary>, AppError> {
    let player = lifecycle::register_player(
        &state,
        RegisterPlayer {
            game_name: payload.game_name,
            chat_id: payload.chat_id,
            chat_name: payload.chat_name,
            server: payload.server,
        },
    )
    .await?;

    let ladder = state.ladder().await;
    let title = ladder.resolve(player.ladder_score);
    let summary = PlayerSummary::new(player, title);
    Ok(Json(summary))
}
