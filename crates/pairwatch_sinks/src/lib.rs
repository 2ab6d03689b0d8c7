//! Output side of the pipeline.
//!
//! - [`LocalRouter`]: moves pair files into the verified and dead-letter folders
//! - [`CsvLedger`]: append-only CSV log of verifications and stats ticks

pub mod ledger;
pub mod router;

pub use ledger::{spawn_flush_task, CsvLedger, STATS_HEADER, VERIFICATION_HEADER};
pub use router::{candidate_name, move_file, move_into, LocalRouter};
