//! Pairwatch Engine
//!
//! Tracks (data file, checksum file) pairs and drives them to a terminal
//! outcome:
//!
//! - [`PairRegistry`]: concurrent map of every pair seen so far
//! - [`Coordinator`]: periodic loop that dispatches ready and expired pairs
//! - [`WorkerPool`]: bounded queue plus N workers running verify-and-route
//! - [`StatsAggregator`]: counters shared by workers and the coordinator
//!
//! Side effects (hashing, moving files, writing the ledger) sit behind the
//! [`Verifier`], [`Router`] and [`ResultLog`] traits.

pub mod coordinator;
pub mod error;
pub mod pool;
pub mod registry;
pub mod stats;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

pub use coordinator::{Coordinator, CoordinatorConfig, DispatchReport};
pub use error::{LedgerError, RouteError, VerifyError};
pub use pool::{JobContext, JobOutcome, PoolConfig, WorkerPool};
pub use registry::{checksum_key, data_key, PairRegistry};
pub use stats::{Statistics, StatsAggregator};
pub use traits::{ResultLog, Router, Verifier};
pub use types::{
    Digest, Pair, Readiness, StatsRecord, VerificationJob, VerificationRecord,
    VerificationResult, CHECKSUM_SUFFIX, DEFAULT_CHUNK_SIZE,
};
