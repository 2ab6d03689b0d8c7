//! Seams between the engine and the side-effecting collaborators.
//!
//! All methods are synchronous: workers call them from `spawn_blocking`.

use crate::error::{LedgerError, RouteError, VerifyError};
use crate::types::{Digest, StatsRecord, VerificationRecord};
use std::path::{Path, PathBuf};

/// Compares a data file against its detached checksum file.
pub trait Verifier: Send + Sync + 'static {
    /// Returns both digests on a match. A mismatch is `VerifyError::Mismatch`.
    fn verify(
        &self,
        data_path: &Path,
        checksum_path: &Path,
        chunk_size: usize,
    ) -> Result<Digest, VerifyError>;
}

/// Relocates pair files to their terminal areas.
pub trait Router: Send + Sync + 'static {
    /// Move a verified data file; returns where it landed.
    fn move_to_verified(&self, path: &Path) -> Result<PathBuf, RouteError>;

    /// Move both halves of a failed pair to dead-letter storage.
    fn move_to_dead_letter(&self, data_path: &Path, checksum_path: &Path)
        -> Result<(), RouteError>;

    /// Move a single orphaned half to dead-letter storage.
    fn quarantine(&self, path: &Path) -> Result<PathBuf, RouteError>;

    /// Delete a file that is no longer needed.
    fn discard(&self, path: &Path) -> Result<(), RouteError>;
}

/// Append-only result log.
pub trait ResultLog: Send + Sync + 'static {
    fn record_verification(&self, record: &VerificationRecord) -> Result<(), LedgerError>;

    fn record_stats(&self, record: &StatsRecord) -> Result<(), LedgerError>;
}
