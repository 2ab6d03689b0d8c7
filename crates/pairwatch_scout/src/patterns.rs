//! Filename filters for data files.
//!
//! Patterns are matched against a file's base name only, case-sensitively,
//! with `*` never crossing a path separator.

use crate::error::{Result, ScoutError};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

#[derive(Debug, Clone)]
pub struct FileFilter {
    patterns: Vec<String>,
    set: GlobSet,
}

impl FileFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        if patterns.is_empty() {
            return Err(ScoutError::Pattern("at least one file filter is required".into()));
        }

        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(patterns.len());
        for raw in patterns {
            let pattern = raw.as_ref().trim();
            if pattern.is_empty() {
                return Err(ScoutError::Pattern("empty file filter".into()));
            }
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| ScoutError::Pattern(format!("invalid filter '{}': {}", pattern, e)))?;
            builder.add(glob);
            kept.push(pattern.to_string());
        }

        let set = builder
            .build()
            .map_err(|e| ScoutError::Pattern(e.to_string()))?;
        Ok(Self {
            patterns: kept,
            set,
        })
    }

    /// Does `file_name` (a base name) match any filter?
    pub fn matches(&self, file_name: &str) -> bool {
        self.set.is_match(file_name)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
