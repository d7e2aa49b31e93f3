pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use futures::future::BoxFuture;

use crate::dao::models::{MatchEntity, MatchResultEntity};
use crate::dao::storage::StorageResult;

pub use memory::MemoryGameStore;

/// Abstraction over the persistence layer for matches and their results.
///
/// Writes are last-write-wins: an upsert overwrites whatever row carries the
/// same id without any version check.
pub trait GameStore: Send + Sync {
    /// Insert or fully overwrite the match row keyed by its id, refreshing
    /// `updated_at`, and return the row as stored.
    fn upsert_match(&self, game: MatchEntity) -> BoxFuture<'static, StorageResult<MatchEntity>>;
    /// Most recently updated match of `category`, if any.
    fn latest_match(
        &self,
        category: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Remove a match row; `false` when nothing was deleted.
    fn delete_match(&self, id: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Remove every match last updated before `cutoff`, returning how many went away.
    fn purge_stale(&self, cutoff: SystemTime) -> BoxFuture<'static, StorageResult<u64>>;
    /// Append a finished match to the ledger; an entry with the same id is kept as is.
    fn record_result(&self, result: MatchResultEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Newest-first ledger entries of `category`; `None` reads the whole ledger.
    fn list_results(
        &self,
        category: String,
        limit: Option<usize>,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>>;
    /// Cheap round-trip proving the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
