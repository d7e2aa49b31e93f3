/// Match persistence contract and its backends.
pub mod game_store;
/// Persisted record definitions.
pub mod models;
/// Backend-agnostic storage errors.
pub mod storage;
