//! Errors reported by the engine's collaborators.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A verification attempt that did not produce a match.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("failed to read checksum file {path}: {source}")]
    ReadChecksum {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed checksum file {path}: {reason}")]
    MalformedChecksum { path: PathBuf, reason: String },

    #[error("failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        expected: String,
        #[source]
        source: io::Error,
    },

    #[error("hash mismatch: expected {expected}, computed {computed}")]
    Mismatch { computed: String, expected: String },
}

impl VerifyError {
    /// Computed digest, empty when hashing never finished.
    pub fn computed(&self) -> &str {
        match self {
            VerifyError::Mismatch { computed, .. } => computed,
            _ => "",
        }
    }

    /// Expected digest, empty when the checksum file could not be parsed.
    pub fn expected(&self) -> &str {
        match self {
            VerifyError::Mismatch { expected, .. } | VerifyError::Hash { expected, .. } => expected,
            _ => "",
        }
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, VerifyError::Mismatch { .. })
    }

    /// A read failed because the file is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            VerifyError::ReadChecksum { source, .. } | VerifyError::Hash { source, .. } => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

/// Failure to relocate or delete a file.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path has no file name: {0}")]
    NoFileName(PathBuf),

    #[error("no free destination name for {0}")]
    NoFreeName(PathBuf),
}

impl RouteError {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        RouteError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Failure to append to the result ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("ledger is closed")]
    Closed,
}
