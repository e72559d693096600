/// In-process storage backend used by tests and feature-less builds.
pub mod memory;
/// Database model definitions.
pub mod models;
/// MongoDB storage backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;
/// Storage trait consumed by the match lifecycle.
pub mod record_store;
/// Storage abstraction layer for database operations.
pub mod storage;
