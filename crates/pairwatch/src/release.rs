//! Build identity and release-notes preflight.
//!
//! Production builds refuse to start unless the first entry of the
//! `*.RN.yaml` file next to the executable matches the embedded version,
//! build time and build id.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const RELEASE_NOTES_GLOB: &str = "*.RN.yaml";
const PRODUCTION: &str = "PRODUCTION";
const BANNER_WIDTH: usize = 70;

/// Version identity baked in at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub release: String,
    pub version: String,
    pub build_time: String,
    pub build_id: String,
}

impl BuildInfo {
    /// Read from `PAIRWATCH_RELEASE`, `PAIRWATCH_VERSION`, `PAIRWATCH_BUILD_TIME`
    /// and `PAIRWATCH_BUILD_ID` at compile time.
    pub fn current() -> Self {
        Self {
            release: option_env!("PAIRWATCH_RELEASE")
                .unwrap_or("DEVELOPMENT")
                .to_string(),
            version: option_env!("PAIRWATCH_VERSION")
                .unwrap_or(env!("CARGO_PKG_VERSION"))
                .to_string(),
            build_time: option_env!("PAIRWATCH_BUILD_TIME")
                .unwrap_or("unknown")
                .to_string(),
            build_id: option_env!("PAIRWATCH_BUILD_ID")
                .unwrap_or("unknown")
                .to_string(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.release == PRODUCTION
    }

    pub fn banner(&self, app_name: &str) -> String {
        let rule = "=".repeat(BANNER_WIDTH);
        format!(
            "{rule}\n  {app_name}\n{rule}\n  Release:    {}\n  Version:    {}\n  Build Time: {}\n  Build ID:   {}\n{rule}",
            self.release, self.version, self.build_time, self.build_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub build_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseNotes {
    #[serde(default)]
    pub versions: Vec<VersionInfo>,
}

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("failed to get executable path: {0}")]
    ExecutablePath(#[source] std::io::Error),

    #[error(".RN.yaml file not found in {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no version entries found in release notes {}", .0.display())]
    NoVersions(PathBuf),

    #[error(
        "version mismatch detected:\n  Binary:        version={}, buildTime={}, buildID={}\n  Release Notes: version={}, buildTime={}, buildID={}",
        .binary.version, .binary.build_time, .binary.build_id,
        .notes.version, .notes.datetime, .notes.build_id
    )]
    Mismatch {
        binary: BuildInfo,
        notes: VersionInfo,
    },
}

/// First `*.RN.yaml` in `dir`, in glob order.
pub fn find_release_notes(dir: &Path) -> Result<PathBuf, ReleaseError> {
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        RELEASE_NOTES_GLOB
    );
    glob::glob(&pattern)
        .ok()
        .and_then(|mut paths| paths.find_map(|entry| entry.ok()))
        .ok_or_else(|| ReleaseError::NotFound(dir.to_path_buf()))
}

pub fn first_version(path: &Path) -> Result<VersionInfo, ReleaseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ReleaseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let notes: ReleaseNotes =
        serde_yaml::from_str(&content).map_err(|source| ReleaseError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    notes
        .versions
        .into_iter()
        .next()
        .ok_or_else(|| ReleaseError::NoVersions(path.to_path_buf()))
}

/// Compare the build against the first entry of the release notes in `dir`.
pub fn validate_against(build: &BuildInfo, dir: &Path) -> Result<(), ReleaseError> {
    let notes = first_version(&find_release_notes(dir)?)?;
    if build.version != notes.version
        || build.build_time != notes.datetime
        || build.build_id != notes.build_id
    {
        return Err(ReleaseError::Mismatch {
            binary: build.clone(),
            notes,
        });
    }
    Ok(())
}

/// Startup check. Non-production builds always pass.
pub fn preflight(build: &BuildInfo) -> Result<(), ReleaseError> {
    if !build.is_production() {
        tracing::debug!("Skipping release notes check for {} build", build.release);
        return Ok(());
    }
    let exe = std::env::current_exe().map_err(ReleaseError::ExecutablePath)?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    validate_against(build, dir)?;
    tracing::info!("Release notes match build {}", build.version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn production_build() -> BuildInfo {
        BuildInfo {
            release: "PRODUCTION".into(),
            version: "1.4.0".into(),
            build_time: "2026-01-02T03:04:05Z".into(),
            build_id: "abc123".into(),
        }
    }

    const NOTES: &str = r#"
versions:
  - version: "1.4.0"
    datetime: "2026-01-02T03:04:05Z"
    build_id: "abc123"
  - version: "1.3.0"
    datetime: "2025-11-01T00:00:00Z"
    build_id: "old"
"#;

    #[test]
    fn test_banner_layout() {
        let banner = production_build().banner("pairwatch");
        let lines: Vec<&str> = banner.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "=".repeat(70));
        assert_eq!(lines[1], "  pairwatch");
        assert_eq!(lines[3], "  Release:    PRODUCTION");
        assert_eq!(lines[6], "  Build ID:   abc123");
        assert_eq!(lines[7], lines[0]);
    }

    #[test]
    fn test_matching_release_notes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pairwatch.RN.yaml"), NOTES).unwrap();
        validate_against(&production_build(), dir.path()).unwrap();
    }

    #[test]
    fn test_only_first_entry_counts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pairwatch.RN.yaml"), NOTES).unwrap();
        let mut build = production_build();
        build.version = "1.3.0".into();
        build.build_time = "2025-11-01T00:00:00Z".into();
        build.build_id = "old".into();

        let err = validate_against(&build, dir.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Binary:        version=1.3.0"));
        assert!(msg.contains("Release Notes: version=1.4.0"));
    }

    #[test]
    fn test_missing_and_empty_notes() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            validate_against(&production_build(), dir.path()),
            Err(ReleaseError::NotFound(_))
        ));

        std::fs::write(dir.path().join("x.RN.yaml"), "versions: []\n").unwrap();
        assert!(matches!(
            validate_against(&production_build(), dir.path()),
            Err(ReleaseError::NoVersions(_))
        ));
    }

    #[test]
    fn test_unparseable_notes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.RN.yaml"), "versions: [[[\n").unwrap();
        assert!(matches!(
            validate_against(&production_build(), dir.path()),
            Err(ReleaseError::Parse { .. })
        ));
    }

    #[test]
    fn test_development_build_skips_check() {
        let mut build = production_build();
        build.release = "DEVELOPMENT".into();
        assert!(!build.is_production());
        preflight(&build).unwrap();
    }
}
