use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the ladder backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::event_stream,
        crate::routes::players::list_players,
        crate::routes::players::register_player,
        crate::routes::games::list_games,
        crate::routes::games::register_match,
        crate::routes::games::check_match,
        crate::routes::games::change_prediction,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::player::PlayerSummary,
            crate::dto::player::RegisterPlayerRequest,
            crate::dto::game::GameSummary,
            crate::dto::game::GamePlayerSummary,
            crate::dto::game::RegisterMatchRequest,
            crate::dto::game::CheckMatchRequest,
            crate::dto::game::PredictionRequest,
            crate::dao::models::MatchStatus,
            crate::dao::models::Prediction,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "players", description = "Roster registration and listing"),
        (name = "games", description = "Tracked match operations"),
        (name = "sse", description = "Lifecycle event stream"),
    )
)]
pub struct ApiDoc;
