//! Aggregate counters for the pipeline.
//!
//! One mutex guards the whole counter set so a snapshot is always consistent.
//! Derived figures (averages, rates, uptime) live on [`Statistics`] so they can
//! be computed from any snapshot without touching the lock again.

use crate::types::StatsRecord;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub processed: u64,
    pub success: u64,
    pub failure: u64,
    pub pending: u64,
    pub total_duration: Duration,
    pub started_at: DateTime<Utc>,
}

impl Statistics {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            processed: 0,
            success: 0,
            failure: 0,
            pending: 0,
            total_duration: Duration::ZERO,
            started_at,
        }
    }

    pub fn average_duration(&self) -> Duration {
        if self.processed == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.total_duration.as_secs_f64() / self.processed as f64)
    }

    /// Percentage of processed pairs that verified.
    pub fn success_rate(&self) -> f64 {
        percent(self.success, self.processed)
    }

    pub fn failure_rate(&self) -> f64 {
        percent(self.failure, self.processed)
    }

    pub fn uptime(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Pairs processed per second since start.
    pub fn processing_rate(&self, now: DateTime<Utc>) -> f64 {
        let secs = self.uptime(now).as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.processed as f64 / secs
    }

    pub fn to_record(&self, timestamp: DateTime<Utc>) -> StatsRecord {
        StatsRecord {
            timestamp,
            processed: self.processed,
            success: self.success,
            failure: self.failure,
            pending: self.pending,
            average_duration: self.average_duration(),
        }
    }

    /// Multi-line human summary, printed at shutdown.
    pub fn summary(&self, now: DateTime<Utc>) -> String {
        format!(
            "=== Pairwatch Summary ===\n\
             Uptime:           {:.1}s\n\
             Processed:        {}\n\
             Verified:         {} ({:.1}%)\n\
             Failed:           {} ({:.1}%)\n\
             Pending:          {}\n\
             Avg duration:     {:.4}s\n\
             Processing rate:  {:.2} pairs/s",
            self.uptime(now).as_secs_f64(),
            self.processed,
            self.success,
            self.success_rate(),
            self.failure,
            self.failure_rate(),
            self.pending,
            self.average_duration().as_secs_f64(),
            self.processing_rate(now),
        )
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Thread-safe counter set shared by workers and the coordinator.
#[derive(Debug)]
pub struct StatsAggregator {
    inner: Mutex<Statistics>,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(at: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(Statistics::new(at)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Statistics> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_success(&self, duration: Duration) {
        let mut stats = self.lock();
        stats.processed += 1;
        stats.success += 1;
        stats.total_duration += duration;
    }

    pub fn on_failure(&self, duration: Duration) {
        let mut stats = self.lock();
        stats.processed += 1;
        stats.failure += 1;
        stats.total_duration += duration;
    }

    pub fn set_pending(&self, pending: u64) {
        self.lock().pending = pending;
    }

    pub fn snapshot(&self) -> Statistics {
        self.lock().clone()
    }
}
