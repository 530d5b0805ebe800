//! Simulated generation pipeline for a single job.
//!
//! [`GenerationProcessor`] moves one `pending` job to `processing`, advances
//! its progress in equal steps at a fixed interval, and on the last step
//! attaches a synthesized artifact in the same update that marks it
//! `completed`. A synthesis failure, including a panicking synthesizer,
//! marks the job `failed`; there is no automatic retry. A job that
//! disappears from the registry mid-run is abandoned silently.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use genstream_core::content::ContentArtifact;
use genstream_core::job::{Job, JobUpdate};
use genstream_core::job_events::{
    EVENT_JOB_COMPLETED, EVENT_JOB_FAILED, EVENT_JOB_PROCESSING, EVENT_JOB_PROGRESS,
};
use genstream_core::types::JobId;
use genstream_events::{EventBus, PlatformEvent};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::EngineConfig;
use crate::registry::{AdvanceError, JobRegistry};
use crate::synthesis::{ArtifactSynthesizer, GenerationError};

/// How a single progression ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionOutcome {
    /// The job reached `completed` with a result.
    Completed,
    /// Synthesis failed and the job was marked `failed`.
    Failed,
    /// The job was no longer registered; nothing more was written.
    Abandoned,
    /// The registry refused an update as an invariant violation.
    Rejected,
    /// Shutdown interrupted the progression; the job keeps its last state.
    Cancelled,
}

/// Progress percentage after `step` of `steps` (`step < steps`).
pub fn step_progress(step: u32, steps: u32) -> u8 {
    if steps == 0 {
        return 0;
    }
    (u64::from(step) * 100 / u64::from(steps)).min(99) as u8
}

/// Drives jobs through the simulated pipeline.
///
/// One instance is shared by all jobs; each job runs in its own task
/// started by [`GenerationProcessor::spawn`].
pub struct GenerationProcessor {
    registry: Arc<JobRegistry>,
    synthesizer: Arc<dyn ArtifactSynthesizer>,
    event_bus: Arc<EventBus>,
    steps: u32,
    step_interval: Duration,
}

impl GenerationProcessor {
    pub fn new(
        registry: Arc<JobRegistry>,
        synthesizer: Arc<dyn ArtifactSynthesizer>,
        event_bus: Arc<EventBus>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            registry,
            synthesizer,
            event_bus,
            steps: config.steps.max(1),
            step_interval: config.step_interval,
        }
    }

    /// Start an independent progression task for `job_id`.
    ///
    /// The task is registered with `tracker` so shutdown can wait for it,
    /// and stops early when `cancel` fires.
    pub fn spawn(
        self: &Arc<Self>,
        job_id: JobId,
        tracker: &TaskTracker,
        cancel: CancellationToken,
    ) -> JoinHandle<ProgressionOutcome> {
        let processor = Arc::clone(self);
        tracker.spawn(async move {
            let outcome = processor.run(job_id, &cancel).await;
            tracing::debug!(job_id = %job_id, ?outcome, "Progression task exited");
            outcome
        })
    }

    /// Run the full progression for one job on the current task.
    pub async fn run(&self, job_id: JobId, cancel: &CancellationToken) -> ProgressionOutcome {
        let job = match self.apply(job_id, JobUpdate::processing(0)).await {
            Ok(job) => job,
            Err(outcome) => return outcome,
        };
        tracing::info!(job_id = %job_id, kind = %job.kind, steps = self.steps, "Generation started");
        self.publish(EVENT_JOB_PROCESSING, &job);

        for step in 1..self.steps {
            if !self.pause(job_id, step, cancel).await {
                return ProgressionOutcome::Cancelled;
            }
            let progress = step_progress(step, self.steps);
            match self.apply(job_id, JobUpdate::processing(progress)).await {
                Ok(job) => {
                    tracing::debug!(job_id = %job_id, progress, "Generation progress");
                    self.publish(EVENT_JOB_PROGRESS, &job);
                }
                Err(outcome) => return outcome,
            }
        }

        if !self.pause(job_id, self.steps, cancel).await {
            return ProgressionOutcome::Cancelled;
        }
        self.finish(job_id).await
    }

    /// Sleep one step interval. Returns `false` when shutdown interrupted it.
    async fn pause(&self, job_id: JobId, step: u32, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job_id, step, "Generation interrupted by shutdown");
                false
            }
            _ = tokio::time::sleep(self.step_interval) => true,
        }
    }

    /// Final step: synthesize and complete, or record the failure.
    async fn finish(&self, job_id: JobId) -> ProgressionOutcome {
        let current = match self.registry.get(job_id).await {
            Ok(job) => job,
            Err(_) => {
                tracing::debug!(job_id = %job_id, "Job no longer registered, stopping");
                return ProgressionOutcome::Abandoned;
            }
        };

        match self.synthesize(&current) {
            Ok(artifact) => {
                let content_id = artifact.id;
                match self.apply(job_id, JobUpdate::completed(artifact)).await {
                    Ok(job) => {
                        tracing::info!(job_id = %job_id, content_id = %content_id, "Generation completed");
                        self.publish(EVENT_JOB_COMPLETED, &job);
                        ProgressionOutcome::Completed
                    }
                    Err(outcome) => outcome,
                }
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Generation failed");
                match self
                    .apply(job_id, JobUpdate::failed(current.progress, e.to_string()))
                    .await
                {
                    Ok(job) => {
                        self.publish(EVENT_JOB_FAILED, &job);
                        ProgressionOutcome::Failed
                    }
                    Err(outcome) => outcome,
                }
            }
        }
    }

    /// Run the synthesizer, turning a panic into a [`GenerationError`].
    fn synthesize(&self, job: &Job) -> Result<ContentArtifact, GenerationError> {
        match std::panic::catch_unwind(AssertUnwindSafe(|| self.synthesizer.synthesize(job))) {
            Ok(result) => result,
            Err(panic) => {
                let panic_msg = panic
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| panic.downcast_ref::<&str>().copied())
                    .unwrap_or("unknown panic");
                Err(GenerationError::Panicked(panic_msg.to_string()))
            }
        }
    }

    /// Apply an update, mapping registry refusals to a terminal outcome.
    async fn apply(&self, job_id: JobId, update: JobUpdate) -> Result<Job, ProgressionOutcome> {
        match self.registry.advance(job_id, update).await {
            Ok(job) => Ok(job),
            Err(AdvanceError::NotFound(_)) => {
                tracing::debug!(job_id = %job_id, "Job no longer registered, stopping");
                Err(ProgressionOutcome::Abandoned)
            }
            // Already logged by the registry.
            Err(AdvanceError::InvariantViolation { .. }) => Err(ProgressionOutcome::Rejected),
        }
    }

    fn publish(&self, event_type: &str, job: &Job) {
        let mut event = PlatformEvent::new(event_type)
            .with_job(job.id)
            .with_payload(serde_json::json!({
                "status": job.status,
                "progress": job.progress,
                "error": job.error,
            }));
        if let Some(result) = &job.result {
            event = event.with_content(result.id);
        }
        self.event_bus.publish(event);
    }
}
