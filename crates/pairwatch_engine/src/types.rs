//! Core data types for the pair-tracking engine.
//!
//! A [`Pair`] lives in the [`PairRegistry`](crate::PairRegistry) from its first
//! sighting until a worker removes it. Everything else in this module is a
//! snapshot or a record derived from a pair.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Suffix that marks a detached checksum file (`data.zip` -> `data.zip.sha256`).
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Default I/O chunk size used when hashing (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Which halves of a pair have been sighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Readiness {
    DataOnly,
    ChecksumOnly,
    BothPresent,
}

impl Readiness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Readiness::DataOnly => "data-only",
            Readiness::ChecksumOnly => "checksum-only",
            Readiness::BothPresent => "both-present",
        }
    }
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (data file, checksum file) pair keyed by the data file's base name.
///
/// Readiness is derived from which paths are set, so a both-present pair
/// always carries both paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: String,
    pub data_path: Option<PathBuf>,
    pub checksum_path: Option<PathBuf>,
    pub data_size: u64,
    pub first_seen: DateTime<Utc>,
    pub in_flight: bool,
}

impl Pair {
    pub(crate) fn new(key: String, first_seen: DateTime<Utc>) -> Self {
        Self {
            key,
            data_path: None,
            checksum_path: None,
            data_size: 0,
            first_seen,
            in_flight: false,
        }
    }

    pub fn readiness(&self) -> Readiness {
        match (&self.data_path, &self.checksum_path) {
            (Some(_), Some(_)) => Readiness::BothPresent,
            (None, Some(_)) => Readiness::ChecksumOnly,
            _ => Readiness::DataOnly,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness() == Readiness::BothPresent
    }

    /// Both paths, when the pair is complete.
    pub fn paths(&self) -> Option<(&Path, &Path)> {
        match (&self.data_path, &self.checksum_path) {
            (Some(data), Some(checksum)) => Some((data.as_path(), checksum.as_path())),
            _ => None,
        }
    }

    /// Whichever halves are known, data first.
    pub fn known_paths(&self) -> impl Iterator<Item = &Path> {
        self.data_path
            .iter()
            .chain(self.checksum_path.iter())
            .map(PathBuf::as_path)
    }

    /// Time since first sighting, zero if `now` is earlier.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.first_seen)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Add a std duration to a timestamp, saturating at the maximum timestamp.
pub(crate) fn saturating_add(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Immutable unit of work handed to the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationJob {
    pub pair: Pair,
    pub retry_deadline: DateTime<Utc>,
    pub chunk_size: usize,
}

impl VerificationJob {
    /// Snapshot `pair` with `retry_deadline = first_seen + retry_timeout`.
    pub fn new(pair: Pair, retry_timeout: Duration, chunk_size: usize) -> Self {
        let retry_deadline = saturating_add(pair.first_seen, retry_timeout);
        Self {
            pair,
            retry_deadline,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn key(&self) -> &str {
        &self.pair.key
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now >= self.retry_deadline
    }

    /// Time left before the pair becomes terminal.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.retry_deadline
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Digests produced by a successful comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub computed: String,
    pub expected: String,
}

/// Outcome of one verification attempt.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub job: VerificationJob,
    pub success: bool,
    pub computed: String,
    pub expected: String,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

impl VerificationResult {
    pub fn new(
        job: VerificationJob,
        outcome: Result<Digest, crate::VerifyError>,
        duration: Duration,
    ) -> Self {
        let timestamp = Utc::now();
        match outcome {
            Ok(digest) => Self {
                job,
                success: true,
                computed: digest.computed,
                expected: digest.expected,
                duration,
                timestamp,
                error: None,
            },
            Err(err) => Self {
                job,
                success: false,
                computed: err.computed().to_string(),
                expected: err.expected().to_string(),
                duration,
                timestamp,
                error: Some(err.to_string()),
            },
        }
    }

    /// Turn a successful verification into a failure, e.g. when routing failed.
    pub fn into_failure(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    pub fn filename(&self) -> &str {
        &self.job.pair.key
    }
}

/// One ledger row per successful verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRecord {
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub digest: String,
    pub size_bytes: u64,
    pub duration: Duration,
}

impl VerificationRecord {
    pub fn from_result(result: &VerificationResult) -> Self {
        Self {
            timestamp: result.timestamp,
            filename: result.filename().to_string(),
            digest: result.computed.clone(),
            size_bytes: result.job.pair.data_size,
            duration: result.duration,
        }
    }

    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }
}

/// One ledger row per stats tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRecord {
    pub timestamp: DateTime<Utc>,
    pub processed: u64,
    pub success: u64,
    pub failure: u64,
    pub pending: u64,
    pub average_duration: Duration,
}
