use std::{convert::Infallible, time::SystemTime};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::sse::{ServerEvent, StreamMessage},
    error::ServiceError,
    state::{SharedState, Subscription, game::Match},
};

/// Subscribe to the live updates of `category`.
///
/// The subscription is registered before the latest match is read, and that
/// match is queued first, so a viewer cannot miss a write that lands in
/// between.
pub async fn subscribe_match_updates(
    state: &SharedState,
    category: &str,
) -> Result<Subscription, ServiceError> {
    if !state.config().supports_category(category) {
        return Err(ServiceError::NotFound(format!(
            "unknown game category `{category}`"
        )));
    }

    let subscription = state.hub().subscribe(category);

    if let Ok(store) = state.require_game_store().await {
        match store.latest_match(category.to_owned()).await {
            Ok(Some(latest)) => subscription.prime(latest.into()),
            Ok(None) => {}
            Err(err) => warn!(category, error = %err, "failed to read latest match for new viewer"),
        }
    }

    Ok(subscription)
}

/// Convert a hub subscription into an SSE response, forwarding match updates
/// and releasing the subscription once the client disconnects.
pub fn to_sse_stream(
    mut subscription: Subscription,
    state: &SharedState,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);
    let connected = StreamMessage::Connected {
        poll_interval_ms: state.config().poll_interval().as_millis() as u64,
        degraded: state.is_degraded(),
    };

    tokio::spawn(async move {
        if let Some(event) = encode(&connected)
            && tx.send(Ok(event)).await.is_err()
        {
            return;
        }

        let mut last_seen: Option<(String, SystemTime)> = None;
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                next = subscription.recv() => {
                    let Some(game) = next else { break };
                    if is_stale(last_seen.as_ref(), &game) {
                        continue;
                    }
                    last_seen = Some((game.id.clone(), game.updated_at));

                    let Some(event) = encode(&StreamMessage::GameUpdate { game: game.into() }) else {
                        continue;
                    };
                    if tx.send(Ok(event)).await.is_err() {
                        break;
                    }
                }
            }
        }

        subscription.unsubscribe();
        info!(
            category = subscription.category(),
            subscriber = subscription.id(),
            "match stream disconnected"
        );
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.config().keep_alive())
            .text("keep-alive"),
    )
}

/// An update is stale when it targets the match already forwarded and is not
/// newer than it.
fn is_stale(last_seen: Option<&(String, SystemTime)>, game: &Match) -> bool {
    last_seen.is_some_and(|(id, updated_at)| *id == game.id && game.updated_at <= *updated_at)
}

fn encode(message: &StreamMessage) -> Option<Event> {
    match ServerEvent::json(message) {
        Ok(payload) => Some(Event::default().data(payload.data)),
        Err(err) => {
            warn!(error = %err, "failed to encode stream message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::{AppConfig, DEFAULT_CATEGORY},
        dao::game_store::MemoryGameStore,
        services::game_service,
        state::AppState,
    };

    #[tokio::test]
    async fn new_viewer_receives_latest_match_first() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::new()));
        let opened = game_service::join_match(&state, DEFAULT_CATEGORY, "alice")
            .await
            .unwrap();

        let mut subscription = subscribe_match_updates(&state, DEFAULT_CATEGORY)
            .await
            .unwrap();
        let joined = game_service::join_match(&state, DEFAULT_CATEGORY, "bob")
            .await
            .unwrap();

        let first = subscription.recv().await.unwrap();
        assert_eq!(first.id, opened.id);
        assert!(first.seat_b.is_none());
        let second = subscription.recv().await.unwrap();
        assert_eq!(second.seat_b.as_deref(), Some("bob"));
        assert_eq!(second.id, joined.id);
    }

    #[tokio::test]
    async fn degraded_viewer_still_subscribes() {
        let state = AppState::new(AppConfig::default());
        let mut subscription = subscribe_match_updates(&state, DEFAULT_CATEGORY)
            .await
            .unwrap();
        assert_eq!(state.hub().subscriber_count(Some(DEFAULT_CATEGORY)), 1);
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn unknown_category_is_refused() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            subscribe_match_updates(&state, "chess").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn older_copies_of_the_same_match_are_stale() {
        let game = Match::open(DEFAULT_CATEGORY, "alice");
        let seen = (game.id.clone(), game.updated_at);
        assert!(is_stale(Some(&seen), &game));

        let mut newer = game.clone();
        newer.updated_at += Duration::from_millis(1);
        assert!(!is_stale(Some(&seen), &newer));

        let other = Match::open(DEFAULT_CATEGORY, "alice");
        assert!(!is_stale(Some(&seen), &other));
        assert!(!is_stale(None, &game));
    }
}
