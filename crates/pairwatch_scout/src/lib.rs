//! Pairwatch Scout - discovers data and checksum files in the source folder
//! and reports them to the pair registry.

pub mod error;
pub mod patterns;
pub mod scan_path;
pub mod scanner;

pub use error::{Result, ScoutError};
pub use patterns::FileFilter;
pub use scan_path::{expand_scan_path, validate_scan_path, ScanPathError};
pub use scanner::{ScanReport, Scanner};
