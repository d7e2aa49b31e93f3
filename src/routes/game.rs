use std::collections::BTreeMap;

use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        game::{
            CurrentMatchResponse, MatchDto, MatchResultDto, MoveRequest, MoveResponse,
            PlayerStatsDto, StatsResponse, SyncMatchRequest,
        },
        validation::validate_player_name,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

const PLAYER_HEADER: &str = "x-player-name";

/// Display name of the player acting on a request, taken from `X-Player-Name`.
#[derive(Debug, Clone)]
pub struct PlayerName(pub String);

/// Match routes: open reads plus writes that require a player identity.
pub fn router() -> Router<SharedState> {
    let reads = Router::new()
        .route("/games/{category}/current", get(current_match))
        .route("/games/{category}/history", get(history))
        .route("/games/{category}/stats", get(stats));

    let writes = Router::new()
        .route("/games/{category}/join", post(join_match))
        .route("/games/{category}/matches/{id}/moves", post(play_move))
        .route(
            "/games/{category}/matches/{id}/rematch",
            post(request_rematch),
        )
        .route(
            "/games/{category}/matches/{id}",
            put(sync_match).delete(leave_match),
        )
        .route_layer(middleware::from_fn(require_player));

    reads.merge(writes)
}

/// Most recent match of a category, for polling clients.
#[utoipa::path(
    get,
    path = "/games/{category}/current",
    tag = "game",
    params(("category" = String, Path, description = "Game kind, e.g. `tic-tac-toe`")),
    responses(
        (status = 200, description = "Latest match, or null when none exists", body = CurrentMatchResponse),
        (status = 404, description = "Unknown category"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn current_match(
    State(state): State<SharedState>,
    Path(category): Path<String>,
) -> Result<Json<CurrentMatchResponse>, AppError> {
    Ok(Json(game_service::current_match(&state, &category).await?))
}

/// Finished matches of a category, newest first.
#[utoipa::path(
    get,
    path = "/games/{category}/history",
    tag = "game",
    params(("category" = String, Path, description = "Game kind")),
    responses((status = 200, description = "Finished matches", body = [MatchResultDto]))
)]
pub async fn history(
    State(state): State<SharedState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<MatchResultDto>>, AppError> {
    Ok(Json(game_service::history(&state, &category).await?))
}

/// Wins, draws and losses per player.
#[utoipa::path(
    get,
    path = "/games/{category}/stats",
    tag = "game",
    params(("category" = String, Path, description = "Game kind")),
    responses((status = 200, description = "Player name to record", body = BTreeMap<String, PlayerStatsDto>))
)]
pub async fn stats(
    State(state): State<SharedState>,
    Path(category): Path<String>,
) -> Result<Json<StatsResponse>, AppError> {
    Ok(Json(game_service::stats(&state, &category).await?))
}

/// Take a seat in the category's current match, opening one when needed.
#[utoipa::path(
    post,
    path = "/games/{category}/join",
    tag = "game",
    params(
        ("category" = String, Path, description = "Game kind"),
        ("X-Player-Name" = String, Header, description = "Display name of the acting player")
    ),
    responses(
        (status = 200, description = "Match the player is seated in", body = MatchDto),
        (status = 401, description = "Missing player identity"),
        (status = 409, description = "Both seats already taken")
    )
)]
pub async fn join_match(
    State(state): State<SharedState>,
    Path(category): Path<String>,
    Extension(PlayerName(player)): Extension<PlayerName>,
) -> Result<Json<MatchDto>, AppError> {
    Ok(Json(
        game_service::join_match(&state, &category, &player).await?,
    ))
}

/// Place the player's mark; illegal moves come back with `applied = false`.
#[utoipa::path(
    post,
    path = "/games/{category}/matches/{id}/moves",
    tag = "game",
    params(
        ("category" = String, Path, description = "Game kind"),
        ("id" = String, Path, description = "Identifier of the current match"),
        ("X-Player-Name" = String, Header, description = "Display name of the acting player")
    ),
    request_body = MoveRequest,
    responses(
        (status = 200, description = "Move applied or ignored", body = MoveResponse),
        (status = 400, description = "Cell outside the board"),
        (status = 401, description = "Player not seated in the match"),
        (status = 404, description = "Match is not the current one")
    )
)]
pub async fn play_move(
    State(state): State<SharedState>,
    Path((category, id)): Path<(String, String)>,
    Extension(PlayerName(player)): Extension<PlayerName>,
    Valid(Json(payload)): Valid<Json<MoveRequest>>,
) -> Result<Json<MoveResponse>, AppError> {
    let response =
        game_service::play_move(&state, &category, &id, &player, payload.cell.into()).await?;
    Ok(Json(response))
}

/// Ask for, withdraw, or accept a fresh match against the same opponent.
#[utoipa::path(
    post,
    path = "/games/{category}/matches/{id}/rematch",
    tag = "game",
    params(
        ("category" = String, Path, description = "Game kind"),
        ("id" = String, Path, description = "Identifier of the current match"),
        ("X-Player-Name" = String, Header, description = "Display name of the acting player")
    ),
    responses(
        (status = 200, description = "Updated or replacement match", body = MatchDto),
        (status = 409, description = "Second seat still open")
    )
)]
pub async fn request_rematch(
    State(state): State<SharedState>,
    Path((category, id)): Path<(String, String)>,
    Extension(PlayerName(player)): Extension<PlayerName>,
) -> Result<Json<MatchDto>, AppError> {
    Ok(Json(
        game_service::request_rematch(&state, &category, &id, &player).await?,
    ))
}

/// Overwrite a match with the complete state pushed by a client.
#[utoipa::path(
    put,
    path = "/games/{category}/matches/{id}",
    tag = "game",
    params(
        ("category" = String, Path, description = "Game kind"),
        ("id" = String, Path, description = "Identifier of the match"),
        ("X-Player-Name" = String, Header, description = "Display name of the acting player")
    ),
    request_body = SyncMatchRequest,
    responses(
        (status = 200, description = "Match stored", body = MatchDto),
        (status = 400, description = "Malformed match"),
        (status = 409, description = "Sync would rewrite history")
    )
)]
pub async fn sync_match(
    State(state): State<SharedState>,
    Path((category, id)): Path<(String, String)>,
    Extension(PlayerName(player)): Extension<PlayerName>,
    Valid(Json(payload)): Valid<Json<SyncMatchRequest>>,
) -> Result<Json<MatchDto>, AppError> {
    Ok(Json(
        game_service::sync_match(&state, &category, &id, &player, payload).await?,
    ))
}

/// Leave a match; a concluded one is removed after a short delay.
#[utoipa::path(
    delete,
    path = "/games/{category}/matches/{id}",
    tag = "game",
    params(
        ("category" = String, Path, description = "Game kind"),
        ("id" = String, Path, description = "Identifier of the current match"),
        ("X-Player-Name" = String, Header, description = "Display name of the acting player")
    ),
    responses((status = 202, description = "Leave acknowledged"))
)]
pub async fn leave_match(
    State(state): State<SharedState>,
    Path((category, id)): Path<(String, String)>,
    Extension(PlayerName(player)): Extension<PlayerName>,
) -> Result<StatusCode, AppError> {
    game_service::leave_match(&state, &category, &id, &player).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn require_player(mut req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let player = req
        .headers()
        .get(PLAYER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_owned())
        .ok_or_else(|| AppError::Unauthorized("missing player header `X-Player-Name`".into()))?;

    validate_player_name(&player)
        .map_err(|_| AppError::Unauthorized("invalid player name".into()))?;

    req.extensions_mut().insert(PlayerName(player));
    Ok(next.run(req).await)
}
