use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::info;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoMatchDocument, MongoResultDocument},
};
use crate::dao::{
    game_store::GameStore,
    models::{MatchEntity, MatchResultEntity},
    storage::StorageResult,
};

const MATCH_COLLECTION_NAME: &str = "active_matches";
const RESULT_COLLECTION_NAME: &str = "match_results";

/// [`GameStore`] backed by a MongoDB database.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (_client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;
        info!(database = %config.database_name, "connected to MongoDB");

        let store = Self {
            inner: Arc::new(MongoInner {
                database: RwLock::new(database),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let matches = self.matches().await;
        let latest_index = IndexModel::builder()
            .keys(doc! { "category": 1, "updated_at": -1 })
            .options(
                IndexOptions::builder()
                    .name(Some("match_category_updated_idx".to_owned()))
                    .build(),
            )
            .build();
        matches
            .create_index(latest_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION_NAME,
                index: "category,updated_at",
                source,
            })?;

        // Stale sweeps filter on the timestamp alone.
        let sweep_index = IndexModel::builder()
            .keys(doc! { "updated_at": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("match_updated_idx".to_owned()))
                    .build(),
            )
            .build();
        matches
            .create_index(sweep_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION_NAME,
                index: "updated_at",
                source,
            })?;

        let results = self.results().await;
        let history_index = IndexModel::builder()
            .keys(doc! { "category": 1, "recorded_at": -1 })
            .options(
                IndexOptions::builder()
                    .name(Some("result_category_recorded_idx".to_owned()))
                    .build(),
            )
            .build();
        results
            .create_index(history_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: RESULT_COLLECTION_NAME,
                index: "category,recorded_at",
                source,
            })?;

        Ok(())
    }

    async fn matches(&self) -> Collection<MongoMatchDocument> {
        let database = self.inner.database.read().await;
        database.collection::<MongoMatchDocument>(MATCH_COLLECTION_NAME)
    }

    async fn results(&self) -> Collection<MongoResultDocument> {
        let database = self.inner.database.read().await;
        database.collection::<MongoResultDocument>(RESULT_COLLECTION_NAME)
    }

    async fn upsert_match(&self, game: MatchEntity) -> MongoResult<MatchEntity> {
        let id = game.id.clone();
        let collection = self.matches().await;

        let previous = collection
            .find_one(doc! { "_id": id.as_str() })
            .await
            .map_err(|source| MongoDaoError::UpsertMatch {
                id: id.clone(),
                source,
            })?;

        // Millisecond precision: step past the stored stamp so the row never ages.
        let now = SystemTime::now();
        let updated_at = match &previous {
            Some(existing) => {
                let floor = existing.updated_at.to_system_time() + Duration::from_millis(1);
                now.max(floor)
            }
            None => now,
        };

        let mut stored = game;
        stored.updated_at = updated_at;
        if let Some(existing) = previous {
            stored.category = existing.category;
        }

        let document = MongoMatchDocument::from(stored.clone());
        collection
            .replace_one(doc! { "_id": id.as_str() }, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::UpsertMatch { id, source })?;

        // Read back through the document so callers see the millisecond stamp.
        document.try_into()
    }

    async fn latest_match(&self, category: String) -> MongoResult<Option<MatchEntity>> {
        let collection = self.matches().await;
        let document = collection
            .find_one(doc! { "category": category.as_str() })
            .sort(doc! { "updated_at": -1 })
            .await
            .map_err(|source| MongoDaoError::LatestMatch { category, source })?;

        document.map(MatchEntity::try_from).transpose()
    }

    async fn delete_match(&self, id: String) -> MongoResult<bool> {
        let collection = self.matches().await;
        let result = collection
            .delete_one(doc! { "_id": id.as_str() })
            .await
            .map_err(|source| MongoDaoError::DeleteMatch { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn purge_stale(&self, cutoff: SystemTime) -> MongoResult<u64> {
        let collection = self.matches().await;
        let result = collection
            .delete_many(doc! { "updated_at": { "$lt": DateTime::from_system_time(cutoff) } })
            .await
            .map_err(|source| MongoDaoError::PurgeStale { source })?;
        Ok(result.deleted_count)
    }

    async fn record_result(&self, result: MatchResultEntity) -> MongoResult<()> {
        let id = result.id.clone();
        let collection = self.results().await;

        let existing = collection
            .find_one(doc! { "_id": id.as_str() })
            .await
            .map_err(|source| MongoDaoError::RecordResult {
                id: id.clone(),
                source,
            })?;
        if existing.is_some() {
            return Ok(());
        }

        collection
            .insert_one(MongoResultDocument::from(result))
            .await
            .map_err(|source| MongoDaoError::RecordResult { id, source })?;
        Ok(())
    }

    async fn list_results(
        &self,
        category: String,
        limit: Option<usize>,
    ) -> MongoResult<Vec<MatchResultEntity>> {
        let collection = self.results().await;
        let mut find = collection
            .find(doc! { "category": category.as_str() })
            .sort(doc! { "recorded_at": -1 });
        if let Some(limit) = limit {
            find = find.limit(limit as i64);
        }
        let documents: Vec<MongoResultDocument> = find
            .await
            .map_err(|source| MongoDaoError::ListResults {
                category: category.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListResults { category, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl GameStore for MongoGameStore {
    fn upsert_match(&self, game: MatchEntity) -> BoxFuture<'static, StorageResult<MatchEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_match(game).await.map_err(Into::into) })
    }

    fn latest_match(
        &self,
        category: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.latest_match(category).await.map_err(Into::into) })
    }

    fn delete_match(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_match(id).await.map_err(Into::into) })
    }

    fn purge_stale(&self, cutoff: SystemTime) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.purge_stale(cutoff).await.map_err(Into::into) })
    }

    fn record_result(&self, result: MatchResultEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.record_result(result).await.map_err(Into::into) })
    }

    fn list_results(
        &self,
        category: String,
        limit: Option<usize>,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchResultEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_results(category, limit)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
