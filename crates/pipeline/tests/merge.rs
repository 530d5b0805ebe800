//! Integration tests for the catalog merge scheduler and the processor's
//! edge cases.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{build_service, test_config, wait_for_status};
use genstream_core::content::{ContentArtifact, ContentKind};
use genstream_core::generation::GenerationRequest;
use genstream_core::job::JobStatus;
use genstream_core::tiers::TierLimits;
use genstream_core::types::ContentId;
use genstream_events::EventBus;
use genstream_pipeline::{
    Catalog, CatalogError, CatalogMergeScheduler, GenerationProcessor, InMemoryCatalog,
    JobRegistry, MergeReport, MockSynthesizer, NewJob, ProgressionOutcome,
};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    registry: Arc<JobRegistry>,
    processor: Arc<GenerationProcessor>,
    tracker: TaskTracker,
}

fn harness() -> Harness {
    let config = test_config();
    let registry = Arc::new(JobRegistry::new(config.estimated_runtime()));
    let processor = Arc::new(GenerationProcessor::new(
        Arc::clone(&registry),
        Arc::new(MockSynthesizer::default()),
        Arc::new(EventBus::default()),
        &config,
    ));
    Harness {
        registry,
        processor,
        tracker: TaskTracker::new(),
    }
}

fn scheduler(registry: &Arc<JobRegistry>, catalog: Arc<dyn Catalog>) -> CatalogMergeScheduler {
    CatalogMergeScheduler::new(
        Arc::clone(registry),
        catalog,
        Arc::new(EventBus::default()),
        Duration::from_millis(50),
    )
}

fn jazz(prompt: &str) -> NewJob {
    NewJob::new(
        GenerationRequest::new(ContentKind::Music, prompt, "Jazz", 30),
        TierLimits::new(10, 30),
    )
}

/// Catalog whose first insert fails, then behaves like the in-memory one.
struct FlakyCatalog {
    inner: InMemoryCatalog,
    failed_once: AtomicBool,
}

#[async_trait]
impl Catalog for FlakyCatalog {
    async fn insert(&self, item: ContentArtifact) -> Result<(), CatalogError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("connection reset".to_string()));
        }
        self.inner.insert(item).await
    }

    async fn exists(&self, id: ContentId) -> Result<bool, CatalogError> {
        self.inner.exists(id).await
    }

    async fn list(&self) -> Result<Vec<ContentArtifact>, CatalogError> {
        self.inner.list().await
    }
}

// ---------------------------------------------------------------------------
// Merge cycles
// ---------------------------------------------------------------------------

/// Running the merge twice over the same completed job inserts it once.
#[tokio::test(start_paused = true)]
async fn merge_cycle_is_idempotent() {
    let h = harness();
    let catalog = Arc::new(InMemoryCatalog::new());
    let scheduler = scheduler(&h.registry, catalog.clone());

    let id = h.registry.create(jazz("Smoky bar")).await.unwrap();
    let outcome = h.processor.run(id, &CancellationToken::new()).await;
    assert_eq!(outcome, ProgressionOutcome::Completed);

    let first = scheduler.run_cycle().await;
    assert_eq!(first, MergeReport { completed: 1, merged: 1, errors: 0 });
    let second = scheduler.run_cycle().await;
    assert_eq!(second, MergeReport { completed: 1, merged: 0, errors: 0 });

    assert_eq!(catalog.len().await, 1);
    let artifact = h.registry.get(id).await.unwrap().result.unwrap();
    assert_eq!(catalog.get(artifact.id).await, Some(artifact));
}

/// Jobs that are not yet completed are left alone.
#[tokio::test(start_paused = true)]
async fn merge_skips_unfinished_jobs() {
    let h = harness();
    let catalog = Arc::new(InMemoryCatalog::new());
    let scheduler = scheduler(&h.registry, catalog.clone());

    h.registry.create(jazz("Still pending")).await.unwrap();

    assert_eq!(scheduler.run_cycle().await, MergeReport::default());
    assert!(catalog.is_empty().await);
}

/// A failing catalog call is counted and retried on the next cycle.
#[tokio::test(start_paused = true)]
async fn failed_insert_is_retried_next_cycle() {
    let h = harness();
    let catalog = Arc::new(FlakyCatalog {
        inner: InMemoryCatalog::new(),
        failed_once: AtomicBool::new(false),
    });
    let scheduler = scheduler(&h.registry, catalog.clone());

    let id = h.registry.create(jazz("Retry me")).await.unwrap();
    h.processor.run(id, &CancellationToken::new()).await;

    assert_eq!(scheduler.run_cycle().await.errors, 1);
    assert!(catalog.inner.is_empty().await);

    assert_eq!(scheduler.run_cycle().await.merged, 1);
    assert_eq!(catalog.inner.len().await, 1);
}

/// New artifacts go to the head of the catalog.
#[tokio::test(start_paused = true)]
async fn merged_items_are_prepended() {
    let h = harness();
    let catalog = Arc::new(InMemoryCatalog::new());
    let scheduler = scheduler(&h.registry, catalog.clone());

    let older = h.registry.create(jazz("Older")).await.unwrap();
    h.processor.run(older, &CancellationToken::new()).await;
    scheduler.run_cycle().await;

    let newer = h.registry.create(jazz("Newer")).await.unwrap();
    h.processor.run(newer, &CancellationToken::new()).await;
    scheduler.run_cycle().await;

    let titles: Vec<_> = catalog
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.title)
        .collect();
    assert_eq!(titles, vec!["Generated music: Newer", "Generated music: Older"]);
}

// ---------------------------------------------------------------------------
// Running service
// ---------------------------------------------------------------------------

/// Two concurrent submissions both complete and each lands in the catalog
/// exactly once.
#[tokio::test(start_paused = true)]
async fn concurrent_jobs_each_merge_once() {
    let (service, catalog) = build_service();
    service.start();
    let limits = TierLimits::new(10, 300);

    let a = service
        .submit_generation(
            GenerationRequest::new(ContentKind::Video, "City lights", "Cinematic", 60),
            &limits,
        )
        .await
        .unwrap();
    let b = service
        .submit_generation(
            GenerationRequest::new(ContentKind::Music, "Rainy day", "Ambient", 60),
            &limits,
        )
        .await
        .unwrap();

    let job_a = wait_for_status(&service, a, JobStatus::Completed).await;
    let job_b = wait_for_status(&service, b, JobStatus::Completed).await;

    // Give the scheduler a few more cycles to prove nothing is duplicated.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let items = catalog.list().await.unwrap();
    assert_eq!(items.len(), 2);
    for job in [job_a, job_b] {
        let content_id = job.result.unwrap().id;
        assert_eq!(items.iter().filter(|i| i.id == content_id).count(), 1);
    }

    service.shutdown().await;
}

/// While the service runs, every completed job eventually shows up in the
/// catalog.
#[tokio::test(start_paused = true)]
async fn completed_job_is_eventually_merged() {
    let (service, catalog) = build_service();
    service.start();

    let id = service
        .submit_generation(
            GenerationRequest::new(ContentKind::Music, "Morning coffee", "Folk", 20),
            &TierLimits::new(10, 30),
        )
        .await
        .unwrap();
    let content_id = wait_for_status(&service, id, JobStatus::Completed)
        .await
        .result
        .unwrap()
        .id;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !catalog.exists(content_id).await.unwrap() {
        assert!(tokio::time::Instant::now() < deadline, "artifact never merged");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    service.shutdown().await;
}

// ---------------------------------------------------------------------------
// Processor edge cases
// ---------------------------------------------------------------------------

/// A job removed from the registry is abandoned without error.
#[tokio::test(start_paused = true)]
async fn removed_job_is_abandoned() {
    let h = harness();
    let id = h.registry.create(jazz("Gone")).await.unwrap();

    let handle = h.processor.spawn(id, &h.tracker, CancellationToken::new());
    assert!(h.registry.remove(id).await.is_some());

    assert_eq!(handle.await.unwrap(), ProgressionOutcome::Abandoned);
    assert!(h.registry.is_empty().await);
}

/// Cancelling a progression leaves the job in its last recorded state.
#[tokio::test(start_paused = true)]
async fn cancelled_progression_keeps_last_state() {
    let h = harness();
    let id = h.registry.create(jazz("Paused")).await.unwrap();
    let cancel = CancellationToken::new();

    let handle = h.processor.spawn(id, &h.tracker, cancel.clone());
    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();

    assert_eq!(handle.await.unwrap(), ProgressionOutcome::Cancelled);
    let job = h.registry.get(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert!(job.progress > 0 && job.progress < 100);
    assert!(job.result.is_none());
}
