/// OpenAPI documentation generation.
pub mod documentation;
/// Periodic removal of abandoned matches.
pub mod eviction;
/// Match lifecycle: joining, moves, rematches, results.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Server-Sent Events streaming of match updates.
pub mod sse_service;
/// Storage connection supervision and degraded mode.
pub mod storage_supervisor;
