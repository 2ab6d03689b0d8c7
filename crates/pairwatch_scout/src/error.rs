//! Error types for the scanner

use std::io;
use thiserror::Error;

/// Scout error type
#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Pattern error: {0}")]
    Pattern(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ScoutError>;
