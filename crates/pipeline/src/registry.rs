//! Authoritative in-memory store of generation jobs.
//!
//! [`JobRegistry`] keeps one slot per job. Each slot holds an immutable
//! `Arc<Job>` behind its own lock: writers validate against the current
//! record and swap in a new `Arc`, readers clone the `Arc`. A reader therefore
//! always sees a fully-formed record, and writes to one job never wait on
//! reads or writes of another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use genstream_core::error::CoreError;
use genstream_core::generation::{validate_request, GenerationRequest};
use genstream_core::job::{check_update, Job, JobStatus, JobUpdate};
use genstream_core::tiers::TierLimits;
use genstream_core::types::JobId;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Input for [`JobRegistry::create`].
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Externally supplied id; minted by the registry when `None`.
    pub id: Option<JobId>,
    pub request: GenerationRequest,
    pub limits: TierLimits,
}

impl NewJob {
    pub fn new(request: GenerationRequest, limits: TierLimits) -> Self {
        Self {
            id: None,
            request,
            limits,
        }
    }

    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Why [`JobRegistry::advance`] did not apply an update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvanceError {
    /// The job is not (or no longer) registered.
    #[error("Job {0} is not registered")]
    NotFound(JobId),

    /// The update would break a lifecycle invariant and was discarded.
    #[error("Invariant violation on job {id}: {reason}")]
    InvariantViolation { id: JobId, reason: String },
}

struct JobSlot {
    /// Creation order, used to break timestamp ties when listing.
    seq: u64,
    record: RwLock<Arc<Job>>,
}

/// Single source of truth for job state.
///
/// Designed to be shared via `Arc<JobRegistry>` between the submission path,
/// the per-job processors, and the catalog merge scheduler.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<JobSlot>>>,
    next_seq: AtomicU64,
    estimated_runtime: chrono::Duration,
}

impl JobRegistry {
    /// Create an empty registry.
    ///
    /// `estimated_runtime` is added to each job's creation time to produce
    /// its `estimated_completion`.
    pub fn new(estimated_runtime: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            estimated_runtime: chrono::Duration::from_std(estimated_runtime)
                .unwrap_or_else(|_| chrono::Duration::zero()),
        }
    }

    /// Validate a submission and register it as a `pending` job.
    ///
    /// Fails with [`CoreError::Validation`] for a malformed request and with
    /// [`CoreError::Conflict`] when a supplied id is already registered; the
    /// existing record is left untouched in that case.
    pub async fn create(&self, spec: NewJob) -> Result<JobId, CoreError> {
        let validated = validate_request(&spec.request, &spec.limits)?;
        let id = spec.id.unwrap_or_else(Uuid::new_v4);

        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            tracing::warn!(job_id = %id, "Rejected job creation with colliding id");
            return Err(CoreError::job_conflict(id));
        }

        let now = Utc::now();
        let job = Job {
            id,
            kind: validated.kind,
            prompt: validated.prompt,
            style: validated.style.to_string(),
            mood: validated.mood.map(str::to_string),
            duration_secs: validated.duration_secs,
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            estimated_completion: now.checked_add_signed(self.estimated_runtime).unwrap_or(now),
        };

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        jobs.insert(
            id,
            Arc::new(JobSlot {
                seq,
                record: RwLock::new(Arc::new(job)),
            }),
        );

        tracing::debug!(job_id = %id, "Job registered");
        Ok(id)
    }

    /// Point-in-time copy of one job.
    pub async fn get(&self, id: JobId) -> Result<Job, CoreError> {
        let slot = self.slot(id).await.ok_or_else(|| CoreError::job_not_found(id))?;
        let record = Arc::clone(&*slot.record.read().await);
        Ok(Job::clone(&record))
    }

    /// Snapshot of every job, newest-created first.
    pub async fn list(&self) -> Vec<Job> {
        let slots: Vec<Arc<JobSlot>> = self.jobs.read().await.values().cloned().collect();

        let mut snapshot = Vec::with_capacity(slots.len());
        for slot in slots {
            let record = Arc::clone(&*slot.record.read().await);
            snapshot.push((slot.seq, record));
        }

        snapshot.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });
        snapshot
            .into_iter()
            .map(|(_, record)| Job::clone(&record))
            .collect()
    }

    /// Apply a lifecycle update to one job.
    ///
    /// Updates to the same job are linearized by the slot lock. An update
    /// that would break a lifecycle invariant is logged and discarded; it is
    /// a programmer error, not a caller-facing one.
    pub async fn advance(&self, id: JobId, update: JobUpdate) -> Result<Job, AdvanceError> {
        let slot = self.slot(id).await.ok_or(AdvanceError::NotFound(id))?;
        let mut record = slot.record.write().await;

        if let Err(reason) = check_update(&record, &update) {
            tracing::error!(
                job_id = %id,
                current_status = %record.status,
                current_progress = record.progress,
                attempted_status = %update.status,
                attempted_progress = update.progress,
                reason = %reason,
                "Invariant violation: job update rejected",
            );
            return Err(AdvanceError::InvariantViolation { id, reason });
        }

        let mut next = Job::clone(&record);
        next.status = update.status;
        next.progress = update.progress;
        next.result = update.result;
        next.error = update.error;
        next.updated_at = Utc::now();

        let next = Arc::new(next);
        *record = Arc::clone(&next);
        Ok(Job::clone(&next))
    }

    /// Record a terminal failure, keeping the last reached progress.
    pub async fn fail(
        &self,
        id: JobId,
        progress: u8,
        message: impl Into<String>,
    ) -> Result<Job, AdvanceError> {
        self.advance(id, JobUpdate::failed(progress, message)).await
    }

    /// Evict a job. A processor still driving it stops at its next step.
    pub async fn remove(&self, id: JobId) -> Option<Job> {
        let slot = self.jobs.write().await.remove(&id)?;
        let record = Arc::clone(&*slot.record.read().await);
        tracing::debug!(job_id = %id, "Job evicted from registry");
        Some(Job::clone(&record))
    }

    /// Number of registered jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn slot(&self, id: JobId) -> Option<Arc<JobSlot>> {
        self.jobs.read().await.get(&id).cloned()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(crate::config::EngineConfig::default().estimated_runtime())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
