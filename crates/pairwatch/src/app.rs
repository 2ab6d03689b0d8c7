//! Pipeline wiring: builds every component from a [`Config`], runs them as
//! tokio tasks and tears them down in dependency order.

use crate::config::Config;
use anyhow::{Context, Result};
use chrono::Utc;
use pairwatch_engine::{
    Coordinator, JobContext, PairRegistry, ResultLog, Statistics, StatsAggregator, WorkerPool,
};
use pairwatch_integrity::Sha256Verifier;
use pairwatch_scout::{FileFilter, Scanner};
use pairwatch_sinks::{spawn_flush_task, CsvLedger, LocalRouter};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A background task and the token that stops it.
struct Stage {
    name: &'static str,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl Stage {
    fn spawn<F, Fut>(name: &'static str, task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(task(shutdown.clone()));
        Self {
            name,
            shutdown,
            handle,
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            error!("{} task failed: {}", self.name, e);
        }
    }
}

/// A running pipeline.
pub struct Pipeline {
    registry: Arc<PairRegistry>,
    stats: Arc<StatsAggregator>,
    pool: Arc<WorkerPool>,
    ledger: Arc<CsvLedger>,
    scanner: Stage,
    coordinator: Stage,
    flusher: Stage,
}

impl Pipeline {
    /// Open the ledger, start the workers, coordinator and scanner.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config) -> Result<Self> {
        let spec = &config.spec;

        let router = LocalRouter::new(
            &spec.destination.verified_folder,
            &spec.destination.dlq_folder,
        );
        router
            .ensure_dirs()
            .context("Failed to prepare destination folders")?;

        let filter = FileFilter::new(spec.verification.file_filters.as_slice())
            .context("Invalid file filters")?;

        let ledger = Arc::new(
            CsvLedger::open(&spec.output.verification_file, &spec.output.stats_file)
                .context("Failed to open result ledger")?,
        );
        let flusher = {
            let shutdown = CancellationToken::new();
            let handle = spawn_flush_task(
                Arc::clone(&ledger),
                spec.output.flush_interval,
                shutdown.clone(),
            );
            Stage {
                name: "Ledger flush",
                shutdown,
                handle,
            }
        };

        let registry = Arc::new(PairRegistry::new());
        let stats = Arc::new(StatsAggregator::new());
        let result_log: Arc<dyn ResultLog> = ledger.clone();

        let context = JobContext::new(
            Arc::clone(&registry),
            Arc::clone(&stats),
            Arc::new(Sha256Verifier::new()),
            Arc::new(router),
            Arc::clone(&result_log),
        );
        let pool = Arc::new(WorkerPool::start(config.pool_config(), context));

        let coordinator = {
            let coordinator = Coordinator::new(
                config.coordinator_config(),
                Arc::clone(&registry),
                Arc::clone(&pool),
                Arc::clone(&stats),
                result_log,
            );
            Stage::spawn("Coordinator", move |shutdown| coordinator.run(shutdown))
        };

        let scan_every = spec.source.periodic_scan_interval;
        let scanner = {
            let scanner = Scanner::new(config.source_folder(), filter, Arc::clone(&registry));
            Stage::spawn("Scanner", move |shutdown| scanner.run(scan_every, shutdown))
        };

        info!(
            "Pipeline started: {} workers, queue {}, watching {}",
            spec.concurrency.workers,
            spec.concurrency.queue_size,
            config.source_folder().display()
        );

        Ok(Self {
            registry,
            stats,
            pool,
            ledger,
            scanner,
            coordinator,
            flusher,
        })
    }

    pub fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    /// Stop everything in order and return the final statistics.
    pub async fn shutdown(self) -> Statistics {
        info!("Shutting down pipeline");

        self.scanner.stop().await;
        self.coordinator.stop().await;
        self.pool.stop().await;
        self.flusher.stop().await;
        if let Err(e) = self.ledger.close() {
            error!("Failed to close result ledger: {}", e);
        }

        self.stats.set_pending(self.registry.pending_count() as u64);
        let stats = self.stats.snapshot();
        info!("Pipeline stopped\n{}", stats.summary(Utc::now()));
        stats
    }
}

/// Run the pipeline until `shutdown` resolves.
pub async fn run<S>(config: &Config, shutdown: S) -> Result<Statistics>
where
    S: Future<Output = ()>,
{
    let pipeline = Pipeline::start(config)?;
    shutdown.await;
    Ok(pipeline.shutdown().await)
}
