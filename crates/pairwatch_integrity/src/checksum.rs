//! Detached checksum files.
//!
//! Format: one 64-character hex SHA-256 digest, optionally followed by
//! whitespace and a filename (the `sha256sum` layout). Surrounding whitespace
//! is ignored and the digest is normalised to lowercase.

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("checksum file is empty")]
    Empty,

    #[error("invalid hash length: expected 64, got {0}")]
    BadLength(usize),

    #[error("invalid hex in hash: {0}")]
    NotHex(String),
}

/// Extract the normalised digest from checksum file contents.
pub fn parse_checksum(content: &str) -> Result<String, ChecksumError> {
    let token = content
        .split_whitespace()
        .next()
        .ok_or(ChecksumError::Empty)?;

    if token.len() != DIGEST_HEX_LEN {
        return Err(ChecksumError::BadLength(token.len()));
    }
    if hex::decode(token).is_err() {
        return Err(ChecksumError::NotHex(token.to_string()));
    }
    Ok(token.to_ascii_lowercase())
}

/// Outcome of reading a checksum file.
#[derive(Debug, Error)]
pub enum ReadChecksumError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Malformed(#[from] ChecksumError),
}

pub fn read_checksum_file(path: &Path) -> Result<String, ReadChecksumError> {
    let content = fs::read_to_string(path)?;
    Ok(parse_checksum(&content)?)
}

/// Render a `sha256sum`-style line.
pub fn checksum_line(digest: &str, filename: &str) -> String {
    format!("{}  {}\n", digest.to_ascii_lowercase(), filename)
}

/// Case-insensitive digest comparison.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
