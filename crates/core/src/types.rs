/// All entity identifiers are random UUIDs minted in-process.
pub type EntityId = uuid::Uuid;

/// Identifier of a generation job.
pub type JobId = EntityId;

/// Identifier of a catalog content item.
pub type ContentId = EntityId;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
