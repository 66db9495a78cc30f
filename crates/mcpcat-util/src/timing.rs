//! Timing for probes and catalog updates.
//!
//! A [`TimingGuard`] logs how long its operation took when dropped. The log
//! level depends on how slow it was relative to the operation's thresholds.
//!
//! ```rust,ignore
//! let timer = TimingGuard::probe(&target.endpoint);
//! let outcome = run_probe(&target).await;
//! outcome.response_time_ms = timer.elapsed_ms();
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What is being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// One MCP probe: initialize plus tools/list.
    Probe,
    /// Probe plus the repository write for one entry.
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Probe => "probe",
            Operation::Update => "update",
        }
    }

    /// (info, warn) thresholds.
    fn thresholds(&self) -> (Duration, Duration) {
        match self {
            Operation::Probe => (Duration::from_secs(1), Duration::from_secs(10)),
            Operation::Update => (Duration::from_secs(2), Duration::from_secs(15)),
        }
    }
}

/// Logs the duration of an operation when dropped.
pub struct TimingGuard {
    operation: Operation,
    subject: String,
    start: Instant,
}

impl TimingGuard {
    pub fn new(operation: Operation, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        debug!(operation = operation.as_str(), subject = %subject, "Started");
        Self {
            operation,
            subject,
            start: Instant::now(),
        }
    }

    /// Time a probe against `endpoint`.
    pub fn probe(endpoint: impl Into<String>) -> Self {
        Self::new(Operation::Probe, endpoint)
    }

    /// Time the update of catalog entry `entry_id`.
    pub fn update(entry_id: impl Into<String>) -> Self {
        Self::new(Operation::Update, entry_id)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed milliseconds, saturating.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let (info_after, warn_after) = self.operation.thresholds();
        let operation = self.operation.as_str();
        let duration = format_duration(elapsed);
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        if elapsed >= warn_after {
            warn!(operation, subject = %self.subject, duration_ms, %duration, "Slow operation");
        } else if elapsed >= info_after {
            info!(operation, subject = %self.subject, duration_ms, %duration, "Finished");
        } else {
            debug!(operation, subject = %self.subject, duration_ms, %duration, "Finished");
        }
    }
}

/// Human-friendly duration: `850ms`, `1.25s`, `2m 3.0s`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = (ms % 60_000) as f64 / 1000.0;
        format!("{}m {secs:.1}s", ms / 60_000)
    }
}
