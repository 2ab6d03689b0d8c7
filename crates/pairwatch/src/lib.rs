//! Pairwatch - watches a folder for data/checksum pairs, verifies them and
//! routes each pair to the verified or dead-letter folder.

pub mod app;
pub mod config;
pub mod duration;
pub mod release;
pub mod signal;

pub use app::{run, Pipeline};
pub use config::{Config, ConfigError};
pub use release::{BuildInfo, ReleaseError};
