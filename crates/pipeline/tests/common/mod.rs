//! Shared helpers for the pipeline integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use genstream_core::job::JobStatus;
use genstream_core::types::JobId;
use genstream_pipeline::{
    ArtifactSynthesizer, EngineConfig, GenerationService, InMemoryCatalog, JobView,
    MockSynthesizer,
};

/// Step count used by every test service.
pub const STEPS: u32 = 4;

/// Fast timings; tests run with the tokio clock paused.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        steps: STEPS,
        step_interval: Duration::from_millis(100),
        merge_interval: Duration::from_millis(50),
        event_capacity: 256,
        shutdown_timeout: Duration::from_secs(1),
    }
}

/// Service over a fresh in-memory catalog and the mock synthesizer.
pub fn build_service() -> (GenerationService, Arc<InMemoryCatalog>) {
    build_service_with(Arc::new(MockSynthesizer::default()))
}

pub fn build_service_with(
    synthesizer: Arc<dyn ArtifactSynthesizer>,
) -> (GenerationService, Arc<InMemoryCatalog>) {
    let catalog = Arc::new(InMemoryCatalog::new());
    let service = GenerationService::new(test_config(), catalog.clone(), synthesizer);
    (service, catalog)
}

/// Poll until the job reaches `status`, panicking after ten virtual seconds.
pub async fn wait_for_status(service: &GenerationService, id: JobId, status: JobStatus) -> JobView {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = service.get_job(id).await.expect("job should be registered");
        if job.status == status {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} stuck in {:?} at {}%",
            job.status,
            job.progress
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
