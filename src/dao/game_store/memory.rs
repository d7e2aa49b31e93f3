//! Process-local store used when no database is configured, and by tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::{
    game_store::GameStore,
    models::{MatchEntity, MatchResultEntity},
    storage::StorageResult,
};

/// [`GameStore`] keeping every row in memory.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    matches: DashMap<String, MatchEntity>,
    results: DashMap<String, MatchResultEntity>,
    /// Last stamp handed out, in microseconds since the epoch.
    clock: AtomicU64,
}

impl MemoryInner {
    /// Current time, strictly after every stamp issued before.
    fn next_stamp(&self) -> SystemTime {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_micros() as u64)
            .unwrap_or_default();

        let previous = self
            .clock
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);

        UNIX_EPOCH + Duration::from_micros(now.max(previous + 1))
    }
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of match rows currently held.
    pub fn match_count(&self) -> usize {
        self.inner.matches.len()
    }
}

impl GameStore for MemoryGameStore {
    fn upsert_match(&self, game: MatchEntity) -> BoxFuture<'static, StorageResult<MatchEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut stored = game;
            stored.updated_at = store.inner.next_stamp();

            match store.inner.matches.get_mut(&stored.id) {
                Some(mut existing) => {
                    stored.category = existing.category.clone();
                    *existing = stored.clone();
                }
                None => {
                    store.inner.matches.insert(stored.id.clone(), stored.clone());
                }
            }

            Ok(stored)
        })
    }

    fn latest_match(
        &self,
        category: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .matches
                .iter()
                .filter(|entry| entry.category == category)
                .max_by_key(|entry| entry.updated_at)
                .map(|entry| entry.value().clone()))
        })
    }

    fn delete_match(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.matches.remove(&id).is_some()) })
    }

    fn purge_stale(&self, cutoff: SystemTime) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let before = store.inner.matches.len();
            store
                .inner
                .matches
                .retain(|_, entity| entity.updated_at >= cutoff);
            Ok(before.saturating_sub(store.inner.matches.len()) as u64)
        })
    }

    fn record_result(&self, result: MatchResultEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .inner
                .results
                .entry(result.id.clone())
                .or_insert(result);
            Ok(())
        })
    }

    fn list_results(
        &self,
        category: String,
        limit: Option<usize>,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut results: Vec<MatchResultEntity> = store
                .inner
                .results
                .iter()
                .filter(|entry| entry.category == category)
                .map(|entry| entry.value().clone())
                .collect();
            results.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
            if let Some(limit) = limit {
                results.truncate(limit);
            }
            Ok(results)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::Match;

    fn entity(category: &str, creator: &str) -> MatchEntity {
        Match::open(category, creator).into()
    }

    #[tokio::test]
    async fn latest_match_follows_most_recent_upsert() {
        let store = MemoryGameStore::new();
        let first = store.upsert_match(entity("tic-tac-toe", "alice")).await.unwrap();
        let second = store.upsert_match(entity("tic-tac-toe", "bob")).await.unwrap();
        store.upsert_match(entity("other", "carol")).await.unwrap();

        let latest = store.latest_match("tic-tac-toe".into()).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);

        store.upsert_match(first.clone()).await.unwrap();
        let latest = store.latest_match("tic-tac-toe".into()).await.unwrap().unwrap();
        assert_eq!(latest.id, first.id);

        assert!(store.latest_match("missing".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites_and_never_moves_clock_backwards() {
        let store = MemoryGameStore::new();
        let stored = store.upsert_match(entity("tic-tac-toe", "alice")).await.unwrap();

        let mut changed = stored.clone();
        changed.player_o = Some("bob".into());
        changed.updated_at = UNIX_EPOCH;
        let rewritten = store.upsert_match(changed).await.unwrap();

        assert!(rewritten.updated_at > stored.updated_at);
        assert_eq!(rewritten.player_o.as_deref(), Some("bob"));
        assert_eq!(store.match_count(), 1);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_existed() {
        let store = MemoryGameStore::new();
        let stored = store.upsert_match(entity("tic-tac-toe", "alice")).await.unwrap();

        assert!(store.delete_match(stored.id.clone()).await.unwrap());
        assert!(!store.delete_match(stored.id).await.unwrap());
    }

    #[tokio::test]
    async fn purge_removes_only_stale_rows() {
        let store = MemoryGameStore::new();
        let old = store.upsert_match(entity("tic-tac-toe", "alice")).await.unwrap();
        let cutoff = old.updated_at + Duration::from_micros(1);
        let fresh = store.upsert_match(entity("tic-tac-toe", "bob")).await.unwrap();

        assert_eq!(store.purge_stale(cutoff).await.unwrap(), 1);
        let latest = store.latest_match("tic-tac-toe".into()).await.unwrap().unwrap();
        assert_eq!(latest.id, fresh.id);
    }
}
