use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPathError {
    Empty,
    NotFound(PathBuf),
    NotDirectory(PathBuf),
    NotReadable(PathBuf),
}

impl fmt::Display for ScanPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPathError::Empty => write!(f, "Source folder is empty"),
            ScanPathError::NotFound(path) => write!(f, "Path not found: {}", path.display()),
            ScanPathError::NotDirectory(path) => write!(f, "Not a directory: {}", path.display()),
            ScanPathError::NotReadable(path) => {
                write!(f, "Cannot read directory: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ScanPathError {}

/// Expand a leading `~` to the home directory.
pub fn expand_scan_path(path: &Path) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(path.strip_prefix("~").unwrap_or(path));
        }
    }
    path.to_path_buf()
}

pub fn validate_scan_path(path: &Path) -> Result<(), ScanPathError> {
    if path.as_os_str().is_empty() {
        return Err(ScanPathError::Empty);
    }
    if !path.exists() {
        return Err(ScanPathError::NotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ScanPathError::NotDirectory(path.to_path_buf()));
    }
    if std::fs::read_dir(path).is_err() {
        return Err(ScanPathError::NotReadable(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(validate_scan_path(dir.path()), Ok(()));
        assert_eq!(validate_scan_path(Path::new("")), Err(ScanPathError::Empty));

        let missing = dir.path().join("missing");
        assert_eq!(
            validate_scan_path(&missing),
            Err(ScanPathError::NotFound(missing.clone()))
        );

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert_eq!(
            validate_scan_path(&file),
            Err(ScanPathError::NotDirectory(file.clone()))
        );
    }

    #[test]
    fn test_expand_plain_path() {
        assert_eq!(
            expand_scan_path(Path::new("/data/in")),
            PathBuf::from("/data/in")
        );
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_scan_path(Path::new("~/in")), home.join("in"));
        }
    }
}
