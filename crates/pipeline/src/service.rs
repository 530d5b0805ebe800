//! Generation service facade.
//!
//! [`GenerationService`] is constructed explicitly at startup and owns the
//! registry, the event bus, the per-job processors, and the catalog merge
//! scheduler. It exposes the three caller-facing operations (submit, get,
//! list) plus an explicit start/stop lifecycle for the background tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use genstream_core::content::{ContentArtifact, ContentKind};
use genstream_core::error::CoreError;
use genstream_core::generation::GenerationRequest;
use genstream_core::job::{Job, JobStatus};
use genstream_core::job_events::EVENT_JOB_SUBMITTED;
use genstream_core::tiers::TierLimits;
use genstream_core::types::{JobId, Timestamp};
use genstream_events::{EventBus, JobSubscription, PlatformEvent};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::merge::CatalogMergeScheduler;
use crate::processor::GenerationProcessor;
use crate::registry::{JobRegistry, NewJob};
use crate::synthesis::ArtifactSynthesizer;

/// Read model of a job handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub kind: ContentKind,
    pub prompt: String,
    pub style: String,
    pub mood: Option<String>,
    pub duration_secs: u32,
    pub status: JobStatus,
    pub progress: u8,
    pub result: Option<ContentArtifact>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub estimated_completion: Timestamp,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            kind: job.kind,
            prompt: job.prompt,
            style: job.style,
            mood: job.mood,
            duration_secs: job.duration_secs,
            status: job.status,
            progress: job.progress,
            result: job.result,
            error: job.error,
            created_at: job.created_at,
            estimated_completion: job.estimated_completion,
        }
    }
}

/// Owner of the generation subsystem.
///
/// Share it via `Arc<GenerationService>`; every method takes `&self`.
pub struct GenerationService {
    config: EngineConfig,
    registry: Arc<JobRegistry>,
    catalog: Arc<dyn Catalog>,
    event_bus: Arc<EventBus>,
    processor: Arc<GenerationProcessor>,
    scheduler: Arc<CatalogMergeScheduler>,
    tracker: TaskTracker,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
    started: AtomicBool,
}

impl GenerationService {
    /// Wire up the subsystem. No task runs until [`start`](Self::start) or
    /// the first submission.
    pub fn new(
        config: EngineConfig,
        catalog: Arc<dyn Catalog>,
        synthesizer: Arc<dyn ArtifactSynthesizer>,
    ) -> Self {
        let config = config.normalized();
        let registry = Arc::new(JobRegistry::new(config.estimated_runtime()));
        let event_bus = Arc::new(EventBus::new(config.event_capacity));

        let processor = Arc::new(GenerationProcessor::new(
            Arc::clone(&registry),
            synthesizer,
            Arc::clone(&event_bus),
            &config,
        ));
        let scheduler = Arc::new(CatalogMergeScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&catalog),
            Arc::clone(&event_bus),
            config.merge_interval,
        ));

        Self {
            config,
            registry,
            catalog,
            event_bus,
            processor,
            scheduler,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Spawn the catalog merge scheduler. Calling it again is a no-op.
    pub fn start(&self) {
        if self.cancel.is_cancelled() {
            tracing::warn!("Generation service already shut down, not starting");
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let scheduler = Arc::clone(&self.scheduler);
        let cancel = self.cancel.child_token();
        self.tracker.spawn(async move {
            scheduler.run(cancel).await;
        });
        tracing::info!(
            steps = self.config.steps,
            step_interval_ms = self.config.step_interval.as_millis() as u64,
            "Generation service started",
        );
    }

    /// Validate and register a submission, then start its progression.
    ///
    /// Returns the new job id, or [`CoreError::Validation`] when the request
    /// breaks a rule or a tier limit (no job is created then).
    pub async fn submit_generation(
        &self,
        request: GenerationRequest,
        limits: &TierLimits,
    ) -> Result<JobId, CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::Internal(
                "Generation service is shut down".to_string(),
            ));
        }

        let job_id = self.registry.create(NewJob::new(request, *limits)).await?;
        tracing::info!(job_id = %job_id, "Generation submitted");
        self.event_bus
            .publish(PlatformEvent::new(EVENT_JOB_SUBMITTED).with_job(job_id));

        self.processor
            .spawn(job_id, &self.tracker, self.cancel.child_token());
        Ok(job_id)
    }

    /// Current state of one job.
    pub async fn get_job(&self, job_id: JobId) -> Result<JobView, CoreError> {
        self.registry.get(job_id).await.map(JobView::from)
    }

    /// Every job, newest first.
    pub async fn list_jobs(&self) -> Vec<JobView> {
        self.registry
            .list()
            .await
            .into_iter()
            .map(JobView::from)
            .collect()
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.event_bus.subscribe()
    }

    /// Follow one job's events until it completes or fails.
    ///
    /// Events published before the call (at least `job.submitted`) are not
    /// replayed.
    pub fn subscribe_job(&self, job_id: JobId) -> JobSubscription {
        self.event_bus.subscribe_job(job_id)
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub fn scheduler(&self) -> &Arc<CatalogMergeScheduler> {
        &self.scheduler
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop all background tasks.
    ///
    /// Cancels the master token, then waits up to the configured shutdown
    /// timeout for the scheduler and every in-flight progression to exit.
    /// Interrupted jobs keep their last recorded state.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down generation service");
        self.cancel.cancel();
        self.tracker.close();

        if tokio::time::timeout(self.config.shutdown_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = self.tracker.len(),
                "Timed out waiting for background tasks",
            );
        }

        tracing::info!("Generation service shut down complete");
    }
}
