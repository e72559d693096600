/// OpenAPI document assembly.
pub mod documentation;
/// Health status reporting.
pub mod health_service;
/// Ladder sheet fetching and installation.
pub mod ladder_service;
/// Match lifecycle orchestration (the core state machine).
pub mod lifecycle;
/// Periodic reconciliation timer.
pub mod poller;
/// Ladder-score policy and counter bookkeeping.
pub mod scoring;
/// Lifecycle event fan-out over SSE.
pub mod sse_service;
/// Storage backend supervision and degraded mode.
pub mod storage_supervisor;
