use std::time::Duration;

/// Default number of equal progress steps per job.
pub const DEFAULT_STEPS: u32 = 10;

/// Default pause between two progress steps.
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_secs(2);

/// Default cadence of the catalog merge scheduler.
pub const DEFAULT_MERGE_INTERVAL: Duration = Duration::from_secs(2);

/// Default broadcast buffer for lifecycle events.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Default time budget for draining background tasks on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine configuration loaded from environment variables.
///
/// All fields have defaults matching the simulated pipeline; override via
/// environment variables for demos or tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of progress steps a job goes through (at least 1).
    pub steps: u32,
    /// Pause between steps.
    pub step_interval: Duration,
    /// How often completed jobs are merged into the catalog.
    pub merge_interval: Duration,
    /// Broadcast channel capacity of the event bus.
    pub event_capacity: usize,
    /// Upper bound on waiting for background tasks during shutdown.
    pub shutdown_timeout: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `GENERATION_STEPS`            | `10`    |
    /// | `GENERATION_STEP_INTERVAL_MS` | `2000`  |
    /// | `MERGE_INTERVAL_MS`           | `2000`  |
    /// | `EVENT_CHANNEL_CAPACITY`      | `1024`  |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `5`     |
    ///
    /// Unparsable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            steps: env_parse("GENERATION_STEPS").unwrap_or(defaults.steps),
            step_interval: env_parse("GENERATION_STEP_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.step_interval),
            merge_interval: env_parse("MERGE_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.merge_interval),
            event_capacity: env_parse("EVENT_CHANNEL_CAPACITY").unwrap_or(defaults.event_capacity),
            shutdown_timeout: env_parse("SHUTDOWN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
        }
        .normalized()
    }

    /// Clamp values that would stall the engine.
    pub fn normalized(mut self) -> Self {
        self.steps = self.steps.max(1);
        self.event_capacity = self.event_capacity.max(1);
        if self.merge_interval.is_zero() {
            self.merge_interval = DEFAULT_MERGE_INTERVAL;
        }
        self
    }

    /// Total simulated runtime of one job.
    pub fn estimated_runtime(&self) -> Duration {
        self.step_interval.saturating_mul(self.steps)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            step_interval: DEFAULT_STEP_INTERVAL,
            merge_interval: DEFAULT_MERGE_INTERVAL,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_runtime_is_twenty_seconds() {
        assert_eq!(EngineConfig::default().estimated_runtime(), Duration::from_secs(20));
    }

    #[test]
    fn normalized_clamps_zero_steps() {
        let config = EngineConfig {
            steps: 0,
            merge_interval: Duration::ZERO,
            ..EngineConfig::default()
        }
        .normalized();
        assert_eq!(config.steps, 1);
        assert_eq!(config.merge_interval, DEFAULT_MERGE_INTERVAL);
    }
}
