/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Score submission and leaderboard queries.
pub mod leaderboard_service;
/// Per-session tasks and their real-time scheduler.
pub mod session_runtime;
/// Session registry operations behind the REST routes.
pub mod session_service;
/// Server-Sent Events streaming of session updates.
pub mod sse_service;
/// Score store connection supervisor with backoff.
pub mod storage_supervisor;
