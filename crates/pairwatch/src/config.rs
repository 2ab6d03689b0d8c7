//! YAML configuration.
//!
//! Missing fields deserialize to zero/empty values and are then rejected by
//! [`Config::validate`] with a message naming the field, so a config file gets
//! one clear error instead of a serde path.

use crate::duration;
use pairwatch_engine::{CoordinatorConfig, PoolConfig};
use pairwatch_logging::LogLevel;
use pairwatch_scout::{expand_scan_path, validate_scan_path, FileFilter, ScanPathError};
use serde::Deserialize;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to create {what} folder {path}: {source}")]
    CreateDir {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub spec: Spec,
}

fn default_app_name() -> String {
    "pairwatch".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Spec {
    pub source: SourceConfig,
    pub verification: VerificationConfig,
    pub destination: DestinationConfig,
    pub concurrency: ConcurrencyConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub coordinator: CoordinatorSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceConfig {
    pub folder: PathBuf,
    #[serde(deserialize_with = "duration::deserialize")]
    pub periodic_scan_interval: Duration,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerificationConfig {
    #[serde(deserialize_with = "duration::deserialize")]
    pub retry_timeout: Duration,
    pub buffer_size: usize,
    pub file_filters: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DestinationConfig {
    pub verified_folder: PathBuf,
    pub dlq_folder: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConcurrencyConfig {
    pub workers: usize,
    pub queue_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    pub verification_file: PathBuf,
    pub stats_file: PathBuf,
    #[serde(deserialize_with = "duration::deserialize")]
    pub flush_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default().to_string(),
        }
    }
}

/// Tick periods for the coordinator. Optional in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoordinatorSettings {
    #[serde(deserialize_with = "duration::deserialize")]
    pub dispatch_interval: Duration,
    #[serde(deserialize_with = "duration::deserialize")]
    pub stats_interval: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        let defaults = CoordinatorConfig::default();
        Self {
            dispatch_interval: defaults.dispatch_interval,
            stats_interval: defaults.stats_interval,
        }
    }
}

impl Config {
    /// Read, parse and validate `path`, then create the destination folders.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        config.validate()?;
        config.create_destination_folders()?;
        Ok(config)
    }

    /// Parse only; no validation.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let spec = &self.spec;

        match validate_scan_path(&self.source_folder()) {
            Ok(()) => {}
            Err(ScanPathError::Empty) => return Err(invalid("source.folder cannot be empty")),
            Err(e) => return Err(invalid(format!("source.folder: {}", e))),
        }
        if spec.source.periodic_scan_interval.is_zero() {
            return Err(invalid("source.periodicScanInterval must be positive"));
        }

        if spec.verification.retry_timeout.is_zero() {
            return Err(invalid("verification.retryTimeout must be positive"));
        }
        if spec.verification.buffer_size == 0 {
            return Err(invalid("verification.bufferSize must be positive"));
        }
        if spec.verification.file_filters.is_empty() {
            return Err(invalid("verification.fileFilters cannot be empty"));
        }
        FileFilter::new(spec.verification.file_filters.as_slice())
            .map_err(|e| invalid(format!("verification.fileFilters: {}", e)))?;

        if spec.destination.verified_folder.as_os_str().is_empty() {
            return Err(invalid("destination.verifiedFolder cannot be empty"));
        }
        if spec.destination.dlq_folder.as_os_str().is_empty() {
            return Err(invalid("destination.dlqFolder cannot be empty"));
        }

        if spec.concurrency.workers == 0 {
            return Err(invalid("concurrency.workers must be positive"));
        }
        if spec.concurrency.queue_size == 0 {
            return Err(invalid("concurrency.queueSize must be positive"));
        }

        if spec.output.verification_file.as_os_str().is_empty() {
            return Err(invalid("output.verificationFile cannot be empty"));
        }
        if spec.output.stats_file.as_os_str().is_empty() {
            return Err(invalid("output.statsFile cannot be empty"));
        }
        if spec.output.flush_interval.is_zero() {
            return Err(invalid("output.flushInterval must be positive"));
        }

        if spec.logging.level.parse::<LogLevel>().is_err() {
            return Err(invalid(
                "logging.level must be one of: DEBUG, INFO, WARN, ERROR",
            ));
        }

        if spec.coordinator.dispatch_interval.is_zero() {
            return Err(invalid("coordinator.dispatchInterval must be positive"));
        }
        if spec.coordinator.stats_interval.is_zero() {
            return Err(invalid("coordinator.statsInterval must be positive"));
        }

        Ok(())
    }

    pub fn create_destination_folders(&self) -> Result<(), ConfigError> {
        let folders = [
            ("verified", &self.spec.destination.verified_folder),
            ("DLQ", &self.spec.destination.dlq_folder),
        ];
        for (what, path) in folders {
            fs::create_dir_all(path).map_err(|source| ConfigError::CreateDir {
                what,
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Source folder with a leading `~` expanded.
    pub fn source_folder(&self) -> PathBuf {
        expand_scan_path(&self.spec.source.folder)
    }

    /// Configured level; INFO if the value does not parse.
    pub fn log_level(&self) -> LogLevel {
        self.spec.logging.level.parse().unwrap_or_default()
    }

    /// Multi-line startup summary of the loaded settings.
    pub fn summary(&self) -> String {
        let spec = &self.spec;
        let rows = [
            ("App Name", self.app_name.clone()),
            ("Version", self.app_version.clone()),
            ("Source Folder", self.source_folder().display().to_string()),
            ("Scan Interval", duration::format_duration(spec.source.periodic_scan_interval)),
            ("Retry Timeout", duration::format_duration(spec.verification.retry_timeout)),
            ("Buffer Size", format!("{} bytes", spec.verification.buffer_size)),
            ("File Filters", spec.verification.file_filters.join(", ")),
            ("Verified Folder", spec.destination.verified_folder.display().to_string()),
            ("DLQ Folder", spec.destination.dlq_folder.display().to_string()),
            ("Workers", spec.concurrency.workers.to_string()),
            ("Queue Size", spec.concurrency.queue_size.to_string()),
            ("Log Level", self.log_level().to_string()),
        ];

        let mut out = String::from("=== Configuration Loaded ===\n");
        for (label, value) in rows {
            let _ = writeln!(out, "{:<17}{}", format!("{label}:"), value);
        }
        out.push_str(&"=".repeat(28));
        out
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.spec.concurrency.workers,
            queue_size: self.spec.concurrency.queue_size,
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            dispatch_interval: self.spec.coordinator.dispatch_interval,
            stats_interval: self.spec.coordinator.stats_interval,
            retry_timeout: self.spec.verification.retry_timeout,
            chunk_size: self.spec.verification.buffer_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(source: &Path) -> String {
        format!(
            r#"
appVersion: "1.0.0"
kind: PairwatchConfig
appName: pairwatch-test
spec:
  source:
    folder: {source}
    periodicScanInterval: 2s
  verification:
    retryTimeout: 5m
    bufferSize: 65536
    fileFilters: ["*.zip", "*.bin"]
  destination:
    verifiedFolder: {root}/verified
    dlqFolder: {root}/dlq
  concurrency:
    workers: 4
    queueSize: 50
  output:
    verificationFile: {root}/verification.csv
    statsFile: {root}/stats.csv
    flushInterval: 5s
  logging:
    level: DEBUG
"#,
            source = source.display(),
            root = source.parent().unwrap().display(),
        )
    }

    fn fixture() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("incoming");
        fs::create_dir(&source).unwrap();
        (dir, source)
    }

    fn assert_invalid(config: &Config, field: &str) {
        match config.validate() {
            Err(ConfigError::Invalid(msg)) => {
                assert!(msg.contains(field), "expected error about {field}, got: {msg}")
            }
            other => panic!("expected invalid {field}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_full_config() {
        let (_dir, source) = fixture();
        let config = Config::from_yaml(&sample(&source)).unwrap();

        assert_eq!(config.app_name, "pairwatch-test");
        assert_eq!(config.spec.source.periodic_scan_interval, Duration::from_secs(2));
        assert_eq!(config.spec.verification.retry_timeout, Duration::from_secs(300));
        assert_eq!(config.spec.verification.file_filters, vec!["*.zip", "*.bin"]);
        assert_eq!(config.log_level(), LogLevel::Debug);
        assert_eq!(
            config.pool_config(),
            PoolConfig {
                workers: 4,
                queue_size: 50
            }
        );

        let coordinator = config.coordinator_config();
        assert_eq!(coordinator.dispatch_interval, Duration::from_secs(1));
        assert_eq!(coordinator.stats_interval, Duration::from_secs(30));
        assert_eq!(coordinator.chunk_size, 65536);
        config.validate().unwrap();
    }

    #[test]
    fn test_coordinator_override() {
        let (_dir, source) = fixture();
        let yaml = format!(
            "{}  coordinator:\n    dispatchInterval: 100ms\n    statsInterval: 1m\n",
            sample(&source)
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(
            config.spec.coordinator.dispatch_interval,
            Duration::from_millis(100)
        );
        assert_eq!(config.spec.coordinator.stats_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_bad_duration_is_a_parse_error() {
        let (_dir, source) = fixture();
        let yaml =
            sample(&source).replace("periodicScanInterval: 2s", "periodicScanInterval: soon");
        assert!(matches!(Config::from_yaml(&yaml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_rejects_each_invalid_field() {
        let (_dir, source) = fixture();
        let base = Config::from_yaml(&sample(&source)).unwrap();

        let mut c = base.clone();
        c.spec.source.folder = PathBuf::new();
        assert_invalid(&c, "source.folder");

        let mut c = base.clone();
        c.spec.source.folder = source.join("missing");
        assert_invalid(&c, "source.folder");

        let mut c = base.clone();
        c.spec.source.periodic_scan_interval = Duration::ZERO;
        assert_invalid(&c, "periodicScanInterval");

        let mut c = base.clone();
        c.spec.verification.retry_timeout = Duration::ZERO;
        assert_invalid(&c, "retryTimeout");

        let mut c = base.clone();
        c.spec.verification.buffer_size = 0;
        assert_invalid(&c, "bufferSize");

        let mut c = base.clone();
        c.spec.verification.file_filters.clear();
        assert_invalid(&c, "fileFilters");

        let mut c = base.clone();
        c.spec.verification.file_filters = vec!["[oops".into()];
        assert_invalid(&c, "fileFilters");

        let mut c = base.clone();
        c.spec.destination.verified_folder = PathBuf::new();
        assert_invalid(&c, "verifiedFolder");

        let mut c = base.clone();
        c.spec.destination.dlq_folder = PathBuf::new();
        assert_invalid(&c, "dlqFolder");

        let mut c = base.clone();
        c.spec.concurrency.workers = 0;
        assert_invalid(&c, "workers");

        let mut c = base.clone();
        c.spec.concurrency.queue_size = 0;
        assert_invalid(&c, "queueSize");

        let mut c = base.clone();
        c.spec.output.verification_file = PathBuf::new();
        assert_invalid(&c, "verificationFile");

        let mut c = base.clone();
        c.spec.output.stats_file = PathBuf::new();
        assert_invalid(&c, "statsFile");

        let mut c = base.clone();
        c.spec.output.flush_interval = Duration::ZERO;
        assert_invalid(&c, "flushInterval");

        let mut c = base.clone();
        c.spec.logging.level = "VERBOSE".into();
        assert_invalid(&c, "logging.level");
    }

    #[test]
    fn test_missing_sections_fail_validation() {
        let config = Config::from_yaml("spec: {}\n").unwrap();
        assert_invalid(&config, "source.folder");
        assert_eq!(config.app_name, "pairwatch");
    }

    #[test]
    fn test_load_creates_destination_folders() {
        let (dir, source) = fixture();
        let path = dir.path().join("config.yaml");
        fs::write(&path, sample(&source)).unwrap();

        Config::load(&path).unwrap();
        assert!(dir.path().join("verified").is_dir());
        assert!(dir.path().join("dlq").is_dir());
    }

    #[test]
    fn test_summary_lists_settings() {
        let (_dir, source) = fixture();
        let config = Config::from_yaml(&sample(&source)).unwrap();
        let summary = config.summary();
        let lines: Vec<&str> = summary.lines().collect();

        assert_eq!(lines[0], "=== Configuration Loaded ===");
        assert_eq!(lines[1], "App Name:        pairwatch-test");
        assert_eq!(lines[2], "Version:         1.0.0");
        assert_eq!(lines[3], format!("Source Folder:   {}", source.display()));
        assert_eq!(lines[4], "Scan Interval:   2s");
        assert_eq!(lines[5], "Retry Timeout:   5m0s");
        assert_eq!(lines[6], "Buffer Size:     65536 bytes");
        assert_eq!(lines[7], "File Filters:    *.zip, *.bin");
        assert_eq!(lines[10], "Workers:         4");
        assert_eq!(lines[11], "Queue Size:      50");
        assert_eq!(lines[12], "Log Level:       DEBUG");
        assert_eq!(lines[13], "=".repeat(28));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
