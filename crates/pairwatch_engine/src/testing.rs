//! In-memory collaborators for unit tests.

use crate::error::{LedgerError, RouteError, VerifyError};
use crate::traits::{ResultLog, Router, Verifier};
use crate::types::{Digest, StatsRecord, VerificationRecord};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Treats a pair as matching when the checksum file's content equals the data
/// file's content.
pub struct ContentVerifier;

impl Verifier for ContentVerifier {
    fn verify(&self, data: &Path, checksum: &Path, _chunk: usize) -> Result<Digest, VerifyError> {
        let expected = fs::read_to_string(checksum).map_err(|source| VerifyError::ReadChecksum {
            path: checksum.to_path_buf(),
            source,
        })?;
        let computed = fs::read_to_string(data).map_err(|source| VerifyError::Hash {
            path: data.to_path_buf(),
            expected: expected.clone(),
            source,
        })?;
        if computed == expected {
            Ok(Digest { computed, expected })
        } else {
            Err(VerifyError::Mismatch { computed, expected })
        }
    }
}

/// Deletes the data file before reading it, as if it were removed mid-hash.
pub struct VanishingVerifier;

impl Verifier for VanishingVerifier {
    fn verify(&self, data: &Path, checksum: &Path, chunk: usize) -> Result<Digest, VerifyError> {
        fs::remove_file(data).map_err(|source| VerifyError::Hash {
            path: data.to_path_buf(),
            expected: String::new(),
            source,
        })?;
        ContentVerifier.verify(data, checksum, chunk)
    }
}

/// Moves files with plain renames into two directories and records every call.
pub struct DirRouter {
    pub verified: PathBuf,
    pub dead_letter: PathBuf,
    pub fail_verified_moves: bool,
    pub calls: Mutex<Vec<String>>,
}

impl DirRouter {
    pub fn new(root: &Path) -> Self {
        let verified = root.join("verified");
        let dead_letter = root.join("dlq");
        fs::create_dir_all(&verified).unwrap();
        fs::create_dir_all(&dead_letter).unwrap();
        Self {
            verified,
            dead_letter,
            fail_verified_moves: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn rename_into(path: &Path, dir: &Path) -> Result<PathBuf, RouteError> {
        let name = path
            .file_name()
            .ok_or_else(|| RouteError::NoFileName(path.to_path_buf()))?;
        let dest = dir.join(name);
        fs::rename(path, &dest).map_err(|e| RouteError::io("rename", path, e))?;
        Ok(dest)
    }
}

fn name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

impl Router for DirRouter {
    fn move_to_verified(&self, path: &Path) -> Result<PathBuf, RouteError> {
        self.log(format!("verified:{}", name(path)));
        if self.fail_verified_moves {
            return Err(RouteError::io(
                "rename",
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        Self::rename_into(path, &self.verified)
    }

    fn move_to_dead_letter(&self, data: &Path, checksum: &Path) -> Result<(), RouteError> {
        self.log(format!("dlq:{}", name(data)));
        Self::rename_into(data, &self.dead_letter)?;
        Self::rename_into(checksum, &self.dead_letter)?;
        Ok(())
    }

    fn quarantine(&self, path: &Path) -> Result<PathBuf, RouteError> {
        self.log(format!("quarantine:{}", name(path)));
        Self::rename_into(path, &self.dead_letter)
    }

    fn discard(&self, path: &Path) -> Result<(), RouteError> {
        self.log(format!("discard:{}", name(path)));
        fs::remove_file(path).map_err(|e| RouteError::io("remove", path, e))
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    pub verifications: Mutex<Vec<VerificationRecord>>,
    pub stats: Mutex<Vec<StatsRecord>>,
}

impl ResultLog for MemoryLedger {
    fn record_verification(&self, record: &VerificationRecord) -> Result<(), LedgerError> {
        self.verifications.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn record_stats(&self, record: &StatsRecord) -> Result<(), LedgerError> {
        self.stats.lock().unwrap().push(record.clone());
        Ok(())
    }
}
