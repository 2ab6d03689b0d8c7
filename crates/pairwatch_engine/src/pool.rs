//! Bounded worker pool that runs verification jobs.
//!
//! N long-lived tasks share one bounded queue. Each job runs its
//! verify-and-route cycle on the blocking thread pool, so a slow disk never
//! stalls the runtime. `submit` never waits: a full queue is reported back to
//! the coordinator, which retries on its next tick.

use crate::registry::PairRegistry;
use crate::stats::StatsAggregator;
use crate::traits::{ResultLog, Router, Verifier};
use crate::types::{VerificationJob, VerificationRecord, VerificationResult};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_size: 100,
        }
    }
}

/// What a worker did with a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Files vanished before verification; the pair was dropped without counting.
    Stale,
    /// Data file moved to verified storage.
    Verified { destination: PathBuf },
    /// Retry window elapsed; both files went to dead-letter storage.
    DeadLettered,
    /// Failed inside the retry window; the pair was released for another tick.
    RetryPending,
    /// Pair expired before both halves arrived; known halves were quarantined.
    Reaped,
}

/// Everything a worker needs to process a job.
pub struct JobContext {
    registry: Arc<PairRegistry>,
    stats: Arc<StatsAggregator>,
    verifier: Arc<dyn Verifier>,
    router: Arc<dyn Router>,
    ledger: Arc<dyn ResultLog>,
}

impl JobContext {
    pub fn new(
        registry: Arc<PairRegistry>,
        stats: Arc<StatsAggregator>,
        verifier: Arc<dyn Verifier>,
        router: Arc<dyn Router>,
        ledger: Arc<dyn ResultLog>,
    ) -> Self {
        Self {
            registry,
            stats,
            verifier,
            router,
            ledger,
        }
    }

    /// Run one job to completion. Blocking.
    pub fn process(&self, job: VerificationJob) -> JobOutcome {
        let paths = job
            .pair
            .paths()
            .map(|(data, checksum)| (data.to_path_buf(), checksum.to_path_buf()));
        let Some((data_path, checksum_path)) = paths else {
            return self.reap(job);
        };

        let vanished = || !data_path.exists() || !checksum_path.exists();
        if vanished() {
            debug!(pair = %job.key(), "files vanished before verification, dropping");
            self.registry.remove(job.key());
            return JobOutcome::Stale;
        }

        let started = Instant::now();
        let outcome = self
            .verifier
            .verify(&data_path, &checksum_path, job.chunk_size);
        if matches!(&outcome, Err(e) if e.is_not_found()) && vanished() {
            debug!(pair = %job.key(), "files vanished during verification, dropping");
            self.registry.remove(job.key());
            return JobOutcome::Stale;
        }

        let result = VerificationResult::new(job, outcome, started.elapsed());

        if result.success {
            self.on_match(result, &data_path, &checksum_path)
        } else {
            self.on_failure(result, &data_path, &checksum_path)
        }
    }

    fn on_match(
        &self,
        result: VerificationResult,
        data_path: &Path,
        checksum_path: &Path,
    ) -> JobOutcome {
        let destination = match self.router.move_to_verified(data_path) {
            Ok(destination) => destination,
            Err(e) => {
                error!(pair = %result.filename(), "Failed to move verified file: {}", e);
                let result = result.into_failure(e.to_string());
                return self.on_failure(result, data_path, checksum_path);
            }
        };

        if let Err(e) = self.router.discard(checksum_path) {
            warn!(pair = %result.filename(), "Failed to remove checksum file: {}", e);
        }

        self.registry.remove(result.filename());
        self.stats.on_success(result.duration);

        let record = VerificationRecord::from_result(&result);
        if let Err(e) = self.ledger.record_verification(&record) {
            error!(pair = %result.filename(), "Failed to write verification record: {}", e);
        }

        info!(
            pair = %result.filename(),
            dest = %destination.display(),
            "Verified ({:.2} KB in {:.4}s)",
            record.size_kb(),
            result.duration.as_secs_f64()
        );
        JobOutcome::Verified { destination }
    }

    fn on_failure(
        &self,
        result: VerificationResult,
        data_path: &Path,
        checksum_path: &Path,
    ) -> JobOutcome {
        let key = result.filename().to_string();
        let reason = result.error.as_deref().unwrap_or("unknown error");
        let now = Utc::now();

        if !result.job.deadline_passed(now) {
            debug!(
                pair = %key,
                remaining_secs = result.job.remaining(now).as_secs(),
                "Verification failed ({}), will retry",
                reason
            );
            self.registry.release(&key);
            return JobOutcome::RetryPending;
        }

        warn!(
            pair = %key,
            expected = %result.expected,
            computed = %result.computed,
            "Verification failed after retry window: {}",
            reason
        );
        if let Err(e) = self.router.move_to_dead_letter(data_path, checksum_path) {
            error!(pair = %key, "Failed to move pair to dead-letter: {}", e);
        }
        self.registry.remove(&key);
        self.stats.on_failure(result.duration);
        JobOutcome::DeadLettered
    }

    /// Handle an expired pair that was not both-present when dispatched.
    fn reap(&self, mut job: VerificationJob) -> JobOutcome {
        // The missing half may have arrived since the snapshot was taken.
        if let Some(current) = self.registry.get(job.key()) {
            let ready = current.is_ready();
            job.pair = current;
            if ready {
                return self.process(job);
            }
        }

        let orphans: Vec<PathBuf> = job
            .pair
            .known_paths()
            .filter(|path| path.exists())
            .map(Path::to_path_buf)
            .collect();

        self.registry.remove(job.key());
        if orphans.is_empty() {
            debug!(pair = %job.key(), "expired pair has no files left, dropping");
            return JobOutcome::Stale;
        }

        warn!(
            pair = %job.key(),
            readiness = %job.pair.readiness(),
            "Pair expired before its counterpart arrived"
        );
        for path in &orphans {
            if let Err(e) = self.router.quarantine(path) {
                error!(pair = %job.key(), "Failed to quarantine {}: {}", path.display(), e);
            }
        }
        self.stats.on_failure(Duration::ZERO);
        JobOutcome::Reaped
    }
}

/// Fixed-size set of workers draining a bounded queue.
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<VerificationJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    capacity: usize,
}

impl WorkerPool {
    /// Spawn the workers. Must be called from inside a tokio runtime.
    pub fn start(config: PoolConfig, context: JobContext) -> Self {
        let capacity = config.queue_size.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let context = Arc::new(context);

        let workers = (0..config.workers)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&rx), Arc::clone(&context))))
            .collect();

        info!(
            "Worker pool started: {} workers, queue capacity {}",
            config.workers, capacity
        );

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            capacity,
        }
    }

    /// Enqueue without waiting. False when the queue is full or closed.
    pub fn submit(&self, job: VerificationJob) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            return false;
        };
        match tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                debug!(pair = %job.key(), "queue full");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Jobs waiting in the queue.
    pub fn queue_len(&self) -> usize {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        sender
            .as_ref()
            .map(|tx| tx.max_capacity() - tx.capacity())
            .unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Close the queue and wait for the workers to drain it.
    pub async fn stop(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        info!("Stopping worker pool, draining {} workers...", workers.len());
        for handle in workers {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }
        info!("Worker pool stopped");
    }
}

async fn worker_loop(
    id: usize,
    queue: Arc<tokio::sync::Mutex<mpsc::Receiver<VerificationJob>>>,
    context: Arc<JobContext>,
) {
    debug!(worker = id, "worker started");
    loop {
        let job = { queue.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        let key = job.pair.key.clone();
        let ctx = Arc::clone(&context);
        match tokio::task::spawn_blocking(move || ctx.process(job)).await {
            Ok(outcome) => debug!(worker = id, pair = %key, ?outcome, "job finished"),
            Err(e) => {
                error!(worker = id, pair = %key, "Job panicked: {}", e);
                context.registry.release(&key);
            }
        }
    }
    debug!(worker = id, "worker stopped");
}
