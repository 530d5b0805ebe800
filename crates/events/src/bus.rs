//! Broadcast bus for job lifecycle events.
//!
//! Producers (the generation processors and the catalog merge scheduler) call
//! [`EventBus::publish`]; observers either take every event with
//! [`EventBus::subscribe`] or follow a single job with
//! [`EventBus::subscribe_job`].

use chrono::{DateTime, Utc};
use genstream_core::job_events::is_terminal_event;
use genstream_core::types::{ContentId, JobId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Default broadcast buffer size.
pub const DEFAULT_CAPACITY: usize = 1024;

/// One lifecycle change of a job or a catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Event name from `genstream_core::job_events`.
    pub event_type: String,
    pub job_id: Option<JobId>,
    pub content_id: Option<ContentId>,
    /// Status, progress and error of the job after the change.
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            job_id: None,
            content_id: None,
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
        }
    }

    pub fn with_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_content(mut self, content_id: ContentId) -> Self {
        self.content_id = Some(content_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Progress carried in the payload, if any.
    pub fn progress(&self) -> Option<u8> {
        self.payload
            .get("progress")
            .and_then(serde_json::Value::as_u64)
            .and_then(|p| u8::try_from(p).ok())
    }
}

/// Fan-out hub shared as `Arc<EventBus>`.
///
/// Publishing never blocks. A subscriber that falls more than the capacity
/// behind loses the oldest events.
///
/// ```rust
/// use genstream_events::{EventBus, PlatformEvent};
///
/// let bus = EventBus::new(16);
/// let _rx = bus.subscribe();
/// bus.publish(PlatformEvent::new("job.submitted"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// A zero `capacity` is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: PlatformEvent) {
        // Err only means nobody is listening.
        if self.sender.send(event).is_err() {
            tracing::trace!("Event published with no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    /// Follow one job until its terminal event.
    pub fn subscribe_job(&self, job_id: JobId) -> JobSubscription {
        JobSubscription {
            rx: self.sender.subscribe(),
            job_id,
            finished: false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Events of a single job, ending after `job.completed` or `job.failed`.
///
/// `catalog.merged` is published after the terminal event and is therefore
/// not seen here.
pub struct JobSubscription {
    rx: broadcast::Receiver<PlatformEvent>,
    job_id: JobId,
    finished: bool,
}

impl JobSubscription {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Next event for the job, or `None` once the job has finished or the bus
    /// is gone. Lagged gaps are logged and skipped.
    pub async fn next(&mut self) -> Option<PlatformEvent> {
        if self.finished {
            return None;
        }
        loop {
            match self.rx.recv().await {
                Ok(event) if event.job_id == Some(self.job_id) => {
                    self.finished = is_terminal_event(&event.event_type);
                    return Some(event);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(job_id = %self.job_id, skipped, "Job subscription lagged");
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}
