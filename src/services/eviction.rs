use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{error::ServiceError, state::SharedState};

/// Periodically drop matches nobody touched within the configured lifetime.
pub async fn run(state: SharedState) {
    let mut ticker = interval(state.config().sweep_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match sweep_once(&state).await {
            Ok(_) => {}
            Err(ServiceError::Degraded) => debug!("skipping stale match sweep in degraded mode"),
            Err(err) => warn!(error = %err, "stale match sweep failed"),
        }
    }
}

/// Remove every match last updated before `now - stale_after`.
pub async fn sweep_once(state: &SharedState) -> Result<u64, ServiceError> {
    let store = state.require_game_store().await?;
    let cutoff = SystemTime::now()
        .checked_sub(state.config().stale_after())
        .unwrap_or(UNIX_EPOCH);

    let purged = store.purge_stale(cutoff).await?;
    if purged > 0 {
        info!(purged, "evicted stale matches");
    }
    Ok(purged)
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
    async fn sweep_keeps_fresh_matches() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::new()));
        game_service::join_match(&state, DEFAULT_CATEGORY, "alice")
            .await
            .unwrap();

        assert_eq!(sweep_once(&state).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sweep_drops_expired_matches() {
        let config = AppConfig::default().with_stale_after(Duration::ZERO);
        let store = MemoryGameStore::new();
        let state = AppState::with_store(config, Arc::new(store.clone()));
        game_service::join_match(&state, DEFAULT_CATEGORY, "alice")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(sweep_once(&state).await.unwrap(), 1);
        assert_eq!(store.match_count(), 0);
    }

    #[tokio::test]
    async fn sweep_requires_a_store() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            sweep_once(&state).await,
            Err(ServiceError::Degraded)
        ));
    }
}
