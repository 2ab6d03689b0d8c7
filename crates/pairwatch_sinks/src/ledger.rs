//! Append-only CSV result ledger.
//!
//! Two files: one row per successful verification and one row per stats tick.
//! Files are opened in append mode and the header is written only when a file
//! is empty, so restarts keep extending the same ledger. Rows sit in the csv
//! writer's buffer until the periodic flush task or [`CsvLedger::close`] pushes
//! them to disk.

use chrono::{DateTime, Local, Utc};
use pairwatch_engine::{LedgerError, ResultLog, StatsRecord, VerificationRecord};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const VERIFICATION_HEADER: [&str; 6] = [
    "Timestamp",
    "Filename",
    "SHA256",
    "Size_Bytes",
    "Size_KB",
    "Duration_Seconds",
];

pub const STATS_HEADER: [&str; 6] = [
    "Timestamp",
    "TotalProcessed",
    "SuccessCount",
    "FailureCount",
    "PendingCount",
    "AverageDuration",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
}

fn open_csv(path: &Path, header: &[&str]) -> Result<csv::Writer<File>, LedgerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_empty = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_empty {
        writer.write_record(header).map_err(io::Error::from)?;
        writer.flush()?;
        debug!("Wrote CSV header to {}", path.display());
    }
    Ok(writer)
}

struct Writers {
    verification: csv::Writer<File>,
    stats: csv::Writer<File>,
}

/// CSV-backed [`ResultLog`].
pub struct CsvLedger {
    writers: Mutex<Option<Writers>>,
}

impl CsvLedger {
    pub fn open(verification_path: &Path, stats_path: &Path) -> Result<Self, LedgerError> {
        let verification = open_csv(verification_path, &VERIFICATION_HEADER)?;
        let stats = open_csv(stats_path, &STATS_HEADER)?;
        info!(
            "Result ledger opened: {} / {}",
            verification_path.display(),
            stats_path.display()
        );
        Ok(Self {
            writers: Mutex::new(Some(Writers {
                verification,
                stats,
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Writers>> {
        self.writers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn flush(&self) -> Result<(), LedgerError> {
        let mut guard = self.lock();
        let writers = guard.as_mut().ok_or(LedgerError::Closed)?;
        writers.verification.flush()?;
        writers.stats.flush()?;
        Ok(())
    }

    /// Flush and release both files. Later writes fail with `Closed`.
    pub fn close(&self) -> Result<(), LedgerError> {
        let Some(mut writers) = self.lock().take() else {
            return Ok(());
        };
        writers.verification.flush()?;
        writers.stats.flush()?;
        info!("Result ledger closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }
}

impl ResultLog for CsvLedger {
    fn record_verification(&self, record: &VerificationRecord) -> Result<(), LedgerError> {
        let mut guard = self.lock();
        let writers = guard.as_mut().ok_or(LedgerError::Closed)?;
        writers
            .verification
            .write_record([
                format_timestamp(record.timestamp),
                record.filename.clone(),
                record.digest.clone(),
                record.size_bytes.to_string(),
                format!("{:.2}", record.size_kb()),
                format!("{:.4}", record.duration.as_secs_f64()),
            ])
            .map_err(io::Error::from)?;
        Ok(())
    }

    fn record_stats(&self, record: &StatsRecord) -> Result<(), LedgerError> {
        let mut guard = self.lock();
        let writers = guard.as_mut().ok_or(LedgerError::Closed)?;
        writers
            .stats
            .write_record([
                format_timestamp(record.timestamp),
                record.processed.to_string(),
                record.success.to_string(),
                record.failure.to_string(),
                record.pending.to_string(),
                format!("{:.4}", record.average_duration.as_secs_f64()),
            ])
            .map_err(io::Error::from)?;
        Ok(())
    }
}

/// Flush `ledger` every `every` until `shutdown` is cancelled.
pub fn spawn_flush_task(
    ledger: Arc<CsvLedger>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
        // First tick completes immediately, skip it
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = ticker.tick() => {
                    match ledger.flush() {
                        Ok(()) => {}
                        Err(LedgerError::Closed) => break,
                        Err(e) => error!("Failed to flush result ledger: {}", e),
                    }
                }
            }
        }
        debug!("Ledger flush task stopped");
    })
}
