//! SHA256 hashing for file integrity

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Compute SHA256 hash of data
pub fn sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a reader, `chunk_size` bytes at a time.
pub fn sha256_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute SHA256 hash of a file without loading it into memory.
pub fn sha256_file(path: &Path, chunk_size: usize) -> io::Result<String> {
    let file = File::open(path)?;
    sha256_reader(file, chunk_size)
}
