//! Periodic merge of completed jobs into the content catalog.
//!
//! [`CatalogMergeScheduler`] polls the registry on a fixed interval and
//! inserts every completed job's artifact that the catalog does not yet
//! hold. It keeps no ledger of merged jobs: the catalog's existence check is
//! what makes a cycle idempotent, so missed or repeated cycles never
//! duplicate or lose an artifact.

use std::sync::Arc;
use std::time::Duration;

use genstream_core::content::ContentArtifact;
use genstream_core::job::JobStatus;
use genstream_core::job_events::EVENT_CATALOG_MERGED;
use genstream_events::{EventBus, PlatformEvent};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::catalog::{Catalog, CatalogError};
use crate::config::DEFAULT_MERGE_INTERVAL;
use crate::registry::JobRegistry;

/// Tally of one merge cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Completed jobs seen in the snapshot.
    pub completed: usize,
    /// Artifacts inserted during this cycle.
    pub merged: usize,
    /// Catalog calls that failed; those jobs are retried next cycle.
    pub errors: usize,
}

/// Background service bridging the registry and the catalog.
pub struct CatalogMergeScheduler {
    registry: Arc<JobRegistry>,
    catalog: Arc<dyn Catalog>,
    event_bus: Arc<EventBus>,
    interval: Duration,
}

impl CatalogMergeScheduler {
    /// A zero `interval` falls back to [`DEFAULT_MERGE_INTERVAL`].
    pub fn new(
        registry: Arc<JobRegistry>,
        catalog: Arc<dyn Catalog>,
        event_bus: Arc<EventBus>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            catalog,
            event_bus,
            interval: if interval.is_zero() {
                DEFAULT_MERGE_INTERVAL
            } else {
                interval
            },
        }
    }

    /// Run the merge loop.
    ///
    /// Runs one cycle per interval tick. The loop exits gracefully when the
    /// provided [`CancellationToken`] is cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Catalog merge scheduler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Catalog merge scheduler cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    if report.merged > 0 || report.errors > 0 {
                        tracing::info!(
                            completed = report.completed,
                            merged = report.merged,
                            errors = report.errors,
                            "Merge cycle finished",
                        );
                    }
                }
            }
        }
    }

    /// One poll cycle over a fresh registry snapshot.
    ///
    /// Items are inserted in snapshot order (newest job first). A failing
    /// catalog call is logged and counted; the cycle continues with the next
    /// job.
    pub async fn run_cycle(&self) -> MergeReport {
        let mut report = MergeReport::default();

        for job in self.registry.list().await {
            if job.status != JobStatus::Completed {
                continue;
            }
            let Some(artifact) = job.result else {
                continue;
            };
            report.completed += 1;

            let content_id = artifact.id;
            match self.merge_one(artifact).await {
                Ok(true) => {
                    report.merged += 1;
                    tracing::info!(job_id = %job.id, content_id = %content_id, "Merged artifact into catalog");
                    self.event_bus.publish(
                        PlatformEvent::new(EVENT_CATALOG_MERGED)
                            .with_job(job.id)
                            .with_content(content_id),
                    );
                }
                Ok(false) => {}
                Err(e) => {
                    report.errors += 1;
                    tracing::error!(
                        job_id = %job.id,
                        content_id = %content_id,
                        error = %e,
                        "Failed to merge artifact into catalog",
                    );
                }
            }
        }

        report
    }

    /// Insert `artifact` unless the catalog already holds it.
    ///
    /// Returns whether an insert happened.
    async fn merge_one(&self, artifact: ContentArtifact) -> Result<bool, CatalogError> {
        if self.catalog.exists(artifact.id).await? {
            return Ok(false);
        }
        match self.catalog.insert(artifact).await {
            Ok(()) => Ok(true),
            // Someone else linked it between the check and the insert.
            Err(CatalogError::Duplicate(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
