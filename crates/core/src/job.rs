//! Generation job record, lifecycle status, and transition rules.
//!
//! The registry in `genstream-pipeline` owns the mutable store; the rules
//! that decide whether an update is legal are pure and live here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::content::{ContentArtifact, ContentKind};
use crate::types::{JobId, Timestamp};

/// Progress value of a finished job.
pub const PROGRESS_COMPLETE: u8 = 100;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` follows
    /// `pending -> processing -> {completed, failed}`.
    ///
    /// `processing -> processing` is allowed (a progress update).
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

/// One submitted generation request and its progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: ContentKind,
    pub prompt: String,
    pub style: String,
    pub mood: Option<String>,
    pub duration_secs: u32,
    pub status: JobStatus,
    /// 0..=100, reaches 100 only when completed.
    pub progress: u8,
    /// Present iff `status == Completed`.
    pub result: Option<ContentArtifact>,
    /// Present iff `status == Failed`.
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub estimated_completion: Timestamp,
}

impl Job {
    /// Whether the job finished successfully with a result attached.
    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed && self.result.is_some()
    }
}

// ---------------------------------------------------------------------------
// Update validation
// ---------------------------------------------------------------------------

/// A proposed state change for an existing job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<ContentArtifact>,
    pub error: Option<String>,
}

impl JobUpdate {
    /// A `processing` update at the given progress.
    pub fn processing(progress: u8) -> Self {
        Self {
            status: JobStatus::Processing,
            progress,
            result: None,
            error: None,
        }
    }

    /// The final `completed` update carrying the artifact.
    pub fn completed(result: ContentArtifact) -> Self {
        Self {
            status: JobStatus::Completed,
            progress: PROGRESS_COMPLETE,
            result: Some(result),
            error: None,
        }
    }

    /// A terminal failure keeping the last reached progress.
    pub fn failed(progress: u8, error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            progress,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Check that applying `update` to `current` keeps every lifecycle invariant.
///
/// Returns a human-readable reason when the update is illegal:
/// - status must move forward along the lifecycle,
/// - progress must not decrease and must be at most 100,
/// - progress is 100 iff the new status is `completed`,
/// - a result is attached iff the new status is `completed`,
/// - an error message is attached iff the new status is `failed`.
pub fn check_update(current: &Job, update: &JobUpdate) -> Result<(), String> {
    if !current.status.can_transition_to(update.status) {
        return Err(format!(
            "illegal status transition {} -> {}",
            current.status, update.status
        ));
    }
    if update.progress > PROGRESS_COMPLETE {
        return Err(format!("progress {} exceeds 100", update.progress));
    }
    if update.progress < current.progress {
        return Err(format!(
            "progress would regress from {} to {}",
            current.progress, update.progress
        ));
    }

    let completed = update.status == JobStatus::Completed;
    if completed != (update.progress == PROGRESS_COMPLETE) {
        return Err(format!(
            "progress {} is inconsistent with status {}",
            update.progress, update.status
        ));
    }
    if completed != update.result.is_some() {
        return Err(format!(
            "result presence is inconsistent with status {}",
            update.status
        ));
    }
    if (update.status == JobStatus::Failed) != update.error.is_some() {
        return Err(format!(
            "error presence is inconsistent with status {}",
            update.status
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn job(status: JobStatus, progress: u8) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            kind: ContentKind::Music,
            prompt: "Upbeat synth".to_string(),
            style: "Electronic".to_string(),
            mood: None,
            duration_secs: 30,
            status,
            progress,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            estimated_completion: now,
        }
    }

    fn artifact() -> ContentArtifact {
        ContentArtifact {
            id: Uuid::new_v4(),
            title: "Generated music: Upbeat synth".to_string(),
            description: String::new(),
            thumbnail_uri: String::new(),
            duration_secs: 30,
            kind: ContentKind::Music,
            genre: "Electronic".to_string(),
            is_synthetic: true,
            media_uri: String::new(),
            views: 0,
            likes: 0,
            tags: vec!["electronic".to_string()],
            created_at: Utc::now(),
        }
    }

    // -- Status transitions --

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn skipping_processing_is_not_allowed() {
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn terminal_states_never_change() {
        for next in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert!(!JobStatus::Completed.can_transition_to(next));
            assert!(!JobStatus::Failed.can_transition_to(next));
        }
    }

    // -- Update checks --

    #[test]
    fn progress_update_is_accepted() {
        assert!(check_update(&job(JobStatus::Processing, 30), &JobUpdate::processing(40)).is_ok());
    }

    #[test]
    fn progress_regression_is_rejected() {
        let err = check_update(&job(JobStatus::Processing, 50), &JobUpdate::processing(40))
            .unwrap_err();
        assert!(err.contains("regress"));
    }

    #[test]
    fn processing_at_hundred_is_rejected() {
        assert!(check_update(&job(JobStatus::Processing, 90), &JobUpdate::processing(100)).is_err());
    }

    #[test]
    fn completion_with_result_is_accepted() {
        let update = JobUpdate::completed(artifact());
        assert!(check_update(&job(JobStatus::Processing, 90), &update).is_ok());
    }

    #[test]
    fn completion_without_result_is_rejected() {
        let update = JobUpdate {
            status: JobStatus::Completed,
            progress: 100,
            result: None,
            error: None,
        };
        assert!(check_update(&job(JobStatus::Processing, 90), &update).is_err());
    }

    #[test]
    fn result_on_processing_is_rejected() {
        let update = JobUpdate {
            status: JobStatus::Processing,
            progress: 50,
            result: Some(artifact()),
            error: None,
        };
        assert!(check_update(&job(JobStatus::Processing, 40), &update).is_err());
    }

    #[test]
    fn failure_keeps_progress() {
        let update = JobUpdate::failed(90, "synthesis failed");
        assert!(check_update(&job(JobStatus::Processing, 90), &update).is_ok());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"processing\""
        );
    }
}
