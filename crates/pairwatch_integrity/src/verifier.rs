use crate::checksum::{digests_match, read_checksum_file, ReadChecksumError};
use crate::signing::sha256_file;
use pairwatch_engine::{Digest, VerifyError, Verifier};
use std::path::Path;
use tracing::debug;

/// Streams the data file through SHA-256 and compares it with the digest in
/// its detached checksum file.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Verifier;

impl Sha256Verifier {
    pub fn new() -> Self {
        Self
    }
}

impl Verifier for Sha256Verifier {
    fn verify(
        &self,
        data_path: &Path,
        checksum_path: &Path,
        chunk_size: usize,
    ) -> Result<Digest, VerifyError> {
        let expected = read_checksum_file(checksum_path).map_err(|e| match e {
            ReadChecksumError::Io(source) => VerifyError::ReadChecksum {
                path: checksum_path.to_path_buf(),
                source,
            },
            ReadChecksumError::Malformed(reason) => VerifyError::MalformedChecksum {
                path: checksum_path.to_path_buf(),
                reason: reason.to_string(),
            },
        })?;

        let computed =
            sha256_file(data_path, chunk_size).map_err(|source| VerifyError::Hash {
                path: data_path.to_path_buf(),
                expected: expected.clone(),
                source,
            })?;

        debug!(
            "Hashed {}: computed {}, expected {}",
            data_path.display(),
            computed,
            expected
        );

        if digests_match(&computed, &expected) {
            Ok(Digest { computed, expected })
        } else {
            Err(VerifyError::Mismatch { computed, expected })
        }
    }
}
