//! Dispatch loop.
//!
//! One task, two ticks: the fast tick turns ready and expired pairs into jobs,
//! the slow tick snapshots statistics into the ledger. The coordinator owns no
//! other component's lifecycle; on cancellation it simply returns.

use crate::pool::WorkerPool;
use crate::registry::PairRegistry;
use crate::stats::{Statistics, StatsAggregator};
use crate::traits::ResultLog;
use crate::types::{Pair, VerificationJob, DEFAULT_CHUNK_SIZE};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub dispatch_interval: Duration,
    pub stats_interval: Duration,
    pub retry_timeout: Duration,
    pub chunk_size: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            dispatch_interval: Duration::from_secs(1),
            stats_interval: Duration::from_secs(30),
            retry_timeout: Duration::from_secs(300),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// What one dispatch tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Jobs accepted by the pool, reaping jobs included.
    pub submitted: usize,
    /// Of those, jobs for expired pairs that never became ready.
    pub reaping: usize,
    /// Pairs skipped because a worker already holds them.
    pub in_flight: usize,
    /// Jobs bounced by a full queue; retried next tick.
    pub rejected: usize,
}

pub struct Coordinator {
    config: CoordinatorConfig,
    registry: Arc<PairRegistry>,
    pool: Arc<WorkerPool>,
    stats: Arc<StatsAggregator>,
    ledger: Arc<dyn ResultLog>,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        registry: Arc<PairRegistry>,
        pool: Arc<WorkerPool>,
        stats: Arc<StatsAggregator>,
        ledger: Arc<dyn ResultLog>,
    ) -> Self {
        Self {
            config,
            registry,
            pool,
            stats,
            ledger,
        }
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        // tokio panics on a zero period.
        let mut dispatch_tick =
            interval(self.config.dispatch_interval.max(Duration::from_millis(1)));
        dispatch_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats_tick = interval(self.config.stats_interval.max(Duration::from_millis(1)));
        stats_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately, skip it
        stats_tick.tick().await;

        info!(
            "Coordinator started (dispatch every {:?}, stats every {:?})",
            self.config.dispatch_interval, self.config.stats_interval
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Coordinator received shutdown signal");
                    break;
                }

                _ = dispatch_tick.tick() => {
                    let report = self.dispatch_once(Utc::now());
                    if report.submitted > 0 {
                        debug!(?report, "dispatch tick");
                    }
                }

                _ = stats_tick.tick() => {
                    self.report_stats();
                }
            }
        }

        info!("Coordinator stopped");
    }

    /// One dispatch pass: ready pairs first, then expired ones that never
    /// became ready.
    pub fn dispatch_once(&self, now: DateTime<Utc>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for pair in self.registry.ready_for_verification() {
            self.dispatch(pair, &mut report);
        }

        for pair in self
            .registry
            .expired(now, self.config.retry_timeout)
            .into_iter()
            .filter(|pair| !pair.is_ready())
        {
            if self.dispatch(pair, &mut report) {
                report.reaping += 1;
            }
        }

        self.stats.set_pending(self.registry.pending_count() as u64);

        if report.rejected > 0 {
            warn!(
                "Worker queue full, {} jobs deferred to next tick",
                report.rejected
            );
        }
        report
    }

    fn dispatch(&self, pair: Pair, report: &mut DispatchReport) -> bool {
        if pair.in_flight || !self.registry.try_claim(&pair.key) {
            report.in_flight += 1;
            return false;
        }

        let key = pair.key.clone();
        let job = VerificationJob::new(pair, self.config.retry_timeout, self.config.chunk_size);
        if self.pool.submit(job) {
            report.submitted += 1;
            true
        } else {
            self.registry.release(&key);
            report.rejected += 1;
            false
        }
    }

    /// Write a stats row and log a summary line.
    pub fn report_stats(&self) -> Statistics {
        let snapshot = self.stats.snapshot();
        let now = Utc::now();

        if let Err(e) = self.ledger.record_stats(&snapshot.to_record(now)) {
            error!("Failed to write stats record: {}", e);
        }

        info!(
            processed = snapshot.processed,
            success = snapshot.success,
            failure = snapshot.failure,
            pending = snapshot.pending,
            queue = self.pool.queue_len(),
            capacity = self.pool.capacity(),
            "Stats: avg {:.4}s, {:.2} pairs/s",
            snapshot.average_duration().as_secs_f64(),
            snapshot.processing_rate(now)
        );
        snapshot
    }
}
