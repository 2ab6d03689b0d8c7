//! Pairwatch Integrity
//!
//! Provides:
//! - **Signing**: streaming SHA-256 hashing of files
//! - **Checksum**: parsing of detached `.sha256` files
//! - **Verifier**: the engine's [`Verifier`](pairwatch_engine::Verifier) backed by both

pub mod checksum;
pub mod signing;
pub mod verifier;

pub use checksum::{checksum_line, parse_checksum, read_checksum_file, ChecksumError};
pub use signing::{sha256, sha256_file};
pub use verifier::Sha256Verifier;
