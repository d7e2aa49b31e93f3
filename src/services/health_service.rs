use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report storage health together with the number of live viewers.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_game_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let live_viewers = state.hub().subscriber_count(None);
    if state.is_degraded() {
        HealthResponse::degraded(live_viewers)
    } else {
        HealthResponse::ok(live_viewers)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::game_store::MemoryGameStore, state::AppState};

    #[tokio::test]
    async fn reports_degraded_without_store() {
        let state = AppState::new(AppConfig::default());
        let _viewer = state.hub().subscribe("tic-tac-toe");

        let health = health_status(&state).await;
        assert_eq!(health.status, "degraded");
        assert_eq!(health.live_viewers, 1);
    }

    #[tokio::test]
    async fn reports_ok_with_store() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::new()));
        assert_eq!(health_status(&state).await.status, "ok");
    }
}
