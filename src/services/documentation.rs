use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Duet Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::match_stream,
        crate::routes::game::current_match,
        crate::routes::game::history,
        crate::routes::game::stats,
        crate::routes::game::join_match,
        crate::routes::game::play_move,
        crate::routes::game::request_rematch,
        crate::routes::game::sync_match,
        crate::routes::game::leave_match,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::MatchDto,
            crate::dto::game::CurrentMatchResponse,
            crate::dto::game::MoveRequest,
            crate::dto::game::MoveResponse,
            crate::dto::game::SyncMatchRequest,
            crate::dto::game::MatchResultDto,
            crate::dto::game::PlayerStatsDto,
            crate::dto::sse::StreamMessage,
            crate::state::game::Seat,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "game", description = "Match lifecycle and results"),
    )
)]
pub struct ApiDoc;
