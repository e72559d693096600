use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::game::{
        CheckMatchRequest, GameSummary, GamesQuery, PredictionRequest, RegisterMatchRequest,
    },
    error::AppError,
    services::lifecycle,
    state::SharedState,
};

/// Default page size for the match listing.
const DEFAULT_PAGE_SIZE: u64 = 10;

/// Routes handling tracked match operations.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games))
        .route("/games", post(register_match))
        .route("/games/check", post(check_match))
        .route("/games/prediction", put(change_prediction))
}

/// Page through tracked matches ordered by creation time.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    params(GamesQuery),
    responses(
        (status = 200, description = "Tracked matches", body = [GameSummary])
    )
)]
pub async fn list_games(
    State(state): State<SharedState>,
    Query(query): Query<GamesQuery>,
) -> Result<Json<Vec<GameSummary>>, AppError> {
    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let games = lifecycle::get_games(&state, offset, limit).await?;
    Ok(Json(games.into_iter().map(Into::into).collect()))
}

/// Open (or re-check) a tracked match for a chat user.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    request_body = RegisterMatchRequest,
    responses(
        (status = 200, description = "Open match state", body = GameSummary),
        (status = 410, description = "Match dropped by timeout or fairness rule")
    )
)]
pub async fn register_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterMatchRequest>>,
) -> Result<Json<GameSummary>, AppError> {
    let record = lifecycle::register_match(&state, &payload.chat_id, payload.channel).await?;
    Ok(Json(record.into()))
}

/// Re-check the open match for a chat user.
#[utoipa::path(
    post,
    path = "/games/check",
    tag = "games",
    request_body = CheckMatchRequest,
    responses(
        (status = 200, description = "Open match state", body = GameSummary),
        (status = 410, description = "Match dropped by timeout or fairness rule")
    )
)]
pub async fn check_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CheckMatchRequest>>,
) -> Result<Json<GameSummary>, AppError> {
    let record = lifecycle::check_match(&state, &payload.chat_id).await?;
    Ok(Json(record.into()))
}

/// Change the prediction on the open match of a chat user.
#[utoipa::path(
    put,
    path = "/games/prediction",
    tag = "games",
    request_body = PredictionRequest,
    responses(
        (status = 200, description = "Updated match", body = GameSummary),
        (status = 409, description = "Match already running; predictions locked")
    )
)]
pub async fn change_prediction(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<PredictionRequest>>,
) -> Result<Json<GameSummary>, AppError> {
    let record = lifecycle::change_prediction(&state, &payload.chat_id, payload.win).await?;
    Ok(Json(record.into()))
}
