use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/games/{category}/stream",
    tag = "sse",
    params(("category" = String, Path, description = "Game kind to follow")),
    responses(
        (status = 200, description = "`connected` then `game-update` messages", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown category")
    )
)]
/// Stream every accepted write on the category's matches to a viewer.
pub async fn match_stream(
    State(state): State<SharedState>,
    Path(category): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe_match_updates(&state, &category).await?;
    info!(
        category = %category,
        subscriber = subscription.id(),
        "new match stream connection"
    );
    Ok(sse_service::to_sse_stream(subscription, &state))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/games/{category}/stream", get(match_stream))
}
