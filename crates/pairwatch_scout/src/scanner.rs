//! Periodic source-folder scanner.
//!
//! Each pass lists the source folder (non-recursively) and reports what it
//! sees to the registry:
//! - every `*.sha256` file as a checksum sighting
//! - every file matching the filters as a data sighting, plus its
//!   `<name>.sha256` companion if that exists
//!
//! Sightings are idempotent, so re-reporting the same files every pass is fine.

use crate::error::Result;
use crate::patterns::FileFilter;
use pairwatch_engine::{PairRegistry, CHECKSUM_SUFFIX};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counts from one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub data_files: usize,
    pub checksum_files: usize,
    pub ignored: usize,
}

#[derive(Debug, Clone)]
pub struct Scanner {
    source: PathBuf,
    filter: FileFilter,
    registry: Arc<PairRegistry>,
}

impl Scanner {
    pub fn new(
        source: impl Into<PathBuf>,
        filter: FileFilter,
        registry: Arc<PairRegistry>,
    ) -> Self {
        Self {
            source: source.into(),
            filter,
            registry,
        }
    }

    /// One pass over the source folder. Blocking.
    pub fn scan_once(&self) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        for entry in fs::read_dir(&self.source)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry in {}: {}", self.source.display(), e);
                    continue;
                }
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                // Vanished between listing and stat.
                Err(e) => {
                    debug!("Failed to stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if metadata.is_dir() {
                continue;
            }

            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if name.ends_with(CHECKSUM_SUFFIX) {
                self.registry.record_checksum(&path);
                report.checksum_files += 1;
                continue;
            }

            if !self.filter.matches(&name) {
                report.ignored += 1;
                continue;
            }

            self.registry.record_data(&path, metadata.len());
            report.data_files += 1;

            let companion = checksum_companion(&path);
            if companion.is_file() {
                self.registry.record_checksum(&companion);
            }
        }

        debug!(
            "Scan of {} complete: {} data files, {} checksum files",
            self.source.display(),
            report.data_files,
            report.checksum_files
        );
        Ok(report)
    }

    /// Scan immediately, then every `every` until `shutdown` is cancelled.
    pub async fn run(self, every: Duration, shutdown: CancellationToken) {
        let scanner = Arc::new(self);
        let mut ticker = interval(every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Scanner started on {} (every {:?}, filters {:?})",
            scanner.source.display(),
            every,
            scanner.filter.patterns()
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = ticker.tick() => {
                    let pass = Arc::clone(&scanner);
                    match tokio::task::spawn_blocking(move || pass.scan_once()).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => error!("Scan of {} failed: {}", scanner.source.display(), e),
                        Err(e) => error!("Scan task panicked: {}", e),
                    }
                }
            }
        }

        info!("Scanner stopped");
    }
}

fn checksum_companion(data_path: &Path) -> PathBuf {
    let mut name = OsString::from(data_path.as_os_str());
    name.push(CHECKSUM_SUFFIX);
    PathBuf::from(name)
}
