use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB match store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to upsert match `{id}`")]
    UpsertMatch {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load latest match of category `{category}`")]
    LatestMatch {
        category: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete match `{id}`")]
    DeleteMatch {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to purge stale matches")]
    PurgeStale {
        #[source]
        source: MongoError,
    },
    #[error("failed to record result `{id}`")]
    RecordResult {
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list results of category `{category}`")]
    ListResults {
        category: String,
        #[source]
        source: MongoError,
    },
    #[error("match document `{id}` holds {cells} cells instead of 9")]
    CorruptBoard { id: String, cells: usize },
}
