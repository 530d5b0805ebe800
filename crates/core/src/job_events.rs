//! Event type constants for generation job lifecycle events.
//!
//! Published on the event bus by the generation processor and the catalog
//! merge scheduler; observers match on these names.

/// A job was accepted and registered in `pending` state.
pub const EVENT_JOB_SUBMITTED: &str = "job.submitted";

/// A job entered the `processing` state.
pub const EVENT_JOB_PROCESSING: &str = "job.processing";

/// Progress update during job execution (percentage).
pub const EVENT_JOB_PROGRESS: &str = "job.progress";

/// Job completed successfully and carries a result artifact.
pub const EVENT_JOB_COMPLETED: &str = "job.completed";

/// Job failed during synthesis.
pub const EVENT_JOB_FAILED: &str = "job.failed";

/// A completed job's artifact was inserted into the catalog.
pub const EVENT_CATALOG_MERGED: &str = "catalog.merged";

/// Whether `event_type` is the last event a job ever emits.
pub fn is_terminal_event(event_type: &str) -> bool {
    matches!(event_type, EVENT_JOB_COMPLETED | EVENT_JOB_FAILED)
}
