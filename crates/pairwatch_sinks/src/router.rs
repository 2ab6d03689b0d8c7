//! Moving pair files into the verified and dead-letter folders.
//!
//! A destination name is claimed atomically: the file is hard-linked into
//! place (or, across filesystems, copied into a file opened with
//! `create_new`), so an existing file is never replaced. When the name is
//! taken the next candidate `stem_N.ext` is tried. The source is removed only
//! once the destination holds the data.

use pairwatch_engine::{RouteError, Router};
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Upper bound on collision suffixes tried before giving up.
const MAX_SUFFIX: u32 = 10_000;

/// Name to try for collision round `n`: `file_name` itself for 0, else
/// `stem_N.ext`.
pub fn candidate_name(file_name: &OsStr, n: u32) -> PathBuf {
    if n == 0 {
        return PathBuf::from(file_name);
    }
    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match as_path.extension() {
        Some(ext) => PathBuf::from(format!("{stem}_{n}.{}", ext.to_string_lossy())),
        None => PathBuf::from(format!("{stem}_{n}")),
    }
}

/// Move `src` to `dest`, failing with `AlreadyExists` if `dest` exists.
pub fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::hard_link(src, dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(e),
        Err(e) => {
            debug!(
                "link {} -> {} failed ({}), falling back to copy",
                src.display(),
                dest.display(),
                e
            );
            return copy_then_remove(src, dest);
        }
    }

    if let Err(e) = fs::remove_file(src) {
        // Undo the link so the file is not left in both places.
        let _ = fs::remove_file(dest);
        return Err(e);
    }
    Ok(())
}

fn copy_then_remove(src: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = File::open(src)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(dest)?;

    // Only the file created above is ever cleaned up.
    copy_contents(&mut reader, &mut writer, src, dest).map_err(|e| {
        let _ = fs::remove_file(dest);
        e
    })
}

fn copy_contents(reader: &mut File, writer: &mut File, src: &Path, dest: &Path) -> io::Result<()> {
    io::copy(reader, writer)?;
    writer.sync_all()?;
    fs::set_permissions(dest, fs::metadata(src)?.permissions())?;
    fs::remove_file(src)
}

/// Move `src` into `dir` under the first free candidate name. Returns the
/// final path.
pub fn move_into(src: &Path, dir: &Path) -> Result<PathBuf, RouteError> {
    let name = src
        .file_name()
        .ok_or_else(|| RouteError::NoFileName(src.to_path_buf()))?;

    for n in 0..=MAX_SUFFIX {
        let dest = dir.join(candidate_name(name, n));
        match move_file(src, &dest) {
            Ok(()) => return Ok(dest),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(RouteError::io("move", src, e)),
        }
    }
    Err(RouteError::NoFreeName(dir.join(name)))
}

/// [`Router`] over two local folders.
#[derive(Debug, Clone)]
pub struct LocalRouter {
    verified_dir: PathBuf,
    dead_letter_dir: PathBuf,
}

impl LocalRouter {
    pub fn new(verified_dir: impl Into<PathBuf>, dead_letter_dir: impl Into<PathBuf>) -> Self {
        Self {
            verified_dir: verified_dir.into(),
            dead_letter_dir: dead_letter_dir.into(),
        }
    }

    /// Create both folders if missing.
    pub fn ensure_dirs(&self) -> Result<(), RouteError> {
        for dir in [&self.verified_dir, &self.dead_letter_dir] {
            fs::create_dir_all(dir).map_err(|e| RouteError::io("create", dir, e))?;
        }
        Ok(())
    }
}

impl Router for LocalRouter {
    fn move_to_verified(&self, path: &Path) -> Result<PathBuf, RouteError> {
        let dest = move_into(path, &self.verified_dir)?;
        debug!("Moved {} -> {}", path.display(), dest.display());
        Ok(dest)
    }

    fn move_to_dead_letter(
        &self,
        data_path: &Path,
        checksum_path: &Path,
    ) -> Result<(), RouteError> {
        let data = move_into(data_path, &self.dead_letter_dir);
        let checksum = move_into(checksum_path, &self.dead_letter_dir);
        match (data, checksum) {
            (Ok(data), Ok(_)) => {
                info!("Moved {} to dead-letter", data.display());
                Ok(())
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(second)) => {
                warn!(
                    "Dead-letter move of {} also failed: {}",
                    checksum_path.display(),
                    second
                );
                Err(e)
            }
        }
    }

    fn quarantine(&self, path: &Path) -> Result<PathBuf, RouteError> {
        let dest = move_into(path, &self.dead_letter_dir)?;
        info!("Quarantined {} -> {}", path.display(), dest.display());
        Ok(dest)
    }

    fn discard(&self, path: &Path) -> Result<(), RouteError> {
        fs::remove_file(path).map_err(|e| RouteError::io("remove", path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_candidate_names() {
        let name = OsStr::new("data.zip");
        assert_eq!(candidate_name(name, 0), PathBuf::from("data.zip"));
        assert_eq!(candidate_name(name, 1), PathBuf::from("data_1.zip"));
        assert_eq!(candidate_name(name, 12), PathBuf::from("data_12.zip"));
        assert_eq!(
            candidate_name(OsStr::new("README"), 1),
            PathBuf::from("README_1")
        );
        assert_eq!(
            candidate_name(OsStr::new("a.zip.sha256"), 1),
            PathBuf::from("a.zip_1.sha256")
        );
    }

    #[test]
    fn test_move_into_skips_taken_names() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("data.zip"), "old").unwrap();
        fs::write(out.join("data_1.zip"), "older").unwrap();
        fs::write(out.join("data_3.zip"), "").unwrap();

        let src = dir.path().join("data.zip");
        fs::write(&src, "new").unwrap();
        let dest = move_into(&src, &out).unwrap();

        assert_eq!(dest, out.join("data_2.zip"));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
        assert_eq!(fs::read_to_string(out.join("data.zip")).unwrap(), "old");
        assert_eq!(fs::read_to_string(out.join("data_1.zip")).unwrap(), "older");
        assert!(!src.exists());
    }

    #[test]
    fn test_move_file_never_replaces() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dest = dir.path().join("dest.bin");
        fs::write(&src, "incoming").unwrap();
        fs::write(&dest, "existing").unwrap();

        let err = move_file(&src, &dest).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "existing");
        assert!(src.exists());
    }

    #[test]
    fn test_copy_fallback_preserves_content() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dest = dir.path().join("dest.bin");
        fs::write(&src, b"payload").unwrap();

        copy_then_remove(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn test_copy_fallback_never_truncates() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        let dest = dir.path().join("dest.bin");
        fs::write(&src, b"payload").unwrap();
        fs::write(&dest, b"existing").unwrap();

        let err = copy_then_remove(&src, &dest).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&dest).unwrap(), b"existing");
        assert!(src.exists());
    }

    #[test]
    fn test_copy_fallback_missing_source() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("dest.bin");
        let err = copy_then_remove(&dir.path().join("nope"), &dest).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!dest.exists());
    }

    #[test]
    fn test_move_into_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = move_into(&dir.path().join("nope"), dir.path()).unwrap_err();
        assert!(matches!(err, RouteError::Io { op: "move", .. }));
    }
}
