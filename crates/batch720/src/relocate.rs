//! Relocation of originals into the done directory.
//!
//! Runs only after a confirmed-successful encode. A failed move leaves the
//! original where it was and is reported separately from encode failures,
//! since the encoded output is still valid.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while moving an original aside.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// The original disappeared before it could be moved.
    #[error("Source file missing: {0}")]
    SourceMissing(PathBuf),

    /// A file with the same name is already archived.
    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// The rename itself failed (cross-device, permissions, missing directory).
    #[error("Failed to move {from} to {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Renames `source` to `done_path`.
///
/// Uses a single `rename`, so the original is either fully at its old path or
/// fully at the new one. There is no copy-and-delete fallback: a cross-device
/// move fails with [`RelocateError::RenameFailed`]. An existing archived file
/// is never overwritten.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use batch720::relocate::relocate_to_done;
///
/// relocate_to_done(Path::new("movie.mkv"), Path::new("done/movie.mkv"))?;
/// # Ok::<(), batch720::relocate::RelocateError>(())
/// ```
pub fn relocate_to_done(source: &Path, done_path: &Path) -> Result<(), RelocateError> {
    if !source.exists() {
        return Err(RelocateError::SourceMissing(source.to_path_buf()));
    }

    // symlink_metadata so a dangling link also counts as occupied
    if fs::symlink_metadata(done_path).is_ok() {
        return Err(RelocateError::DestinationExists(done_path.to_path_buf()));
    }

    fs::rename(source, done_path).map_err(|e| RelocateError::RenameFailed {
        from: source.to_path_buf(),
        to: done_path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(path: &Path, content: &[u8]) {
        let mut file = File::create(path).unwrap();
        file.write_all(content).unwrap();
    }

    #[test]
    fn test_relocate_success() {
        let temp_dir = TempDir::new().unwrap();
        let done_dir = temp_dir.path().join("done");
        fs::create_dir(&done_dir).unwrap();

        let source = temp_dir.path().join("movie.mkv");
        write_file(&source, b"original content");
        let done_path = done_dir.join("movie.mkv");

        relocate_to_done(&source, &done_path).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&done_path).unwrap(), "original content");
    }

    #[test]
    fn test_relocate_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("gone.mkv");
        let done_path = temp_dir.path().join("done.mkv");

        let result = relocate_to_done(&source, &done_path);
        assert!(matches!(result, Err(RelocateError::SourceMissing(_))));
    }

    #[test]
    fn test_relocate_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let done_dir = temp_dir.path().join("done");
        fs::create_dir(&done_dir).unwrap();

        let source = temp_dir.path().join("movie.mkv");
        write_file(&source, b"new original");
        let done_path = done_dir.join("movie.mkv");
        write_file(&done_path, b"archived earlier");

        let result = relocate_to_done(&source, &done_path);
        assert!(matches!(result, Err(RelocateError::DestinationExists(_))));

        // Both files untouched
        assert_eq!(fs::read_to_string(&source).unwrap(), "new original");
        assert_eq!(fs::read_to_string(&done_path).unwrap(), "archived earlier");
    }

    #[test]
    fn test_relocate_missing_done_dir_keeps_source() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("movie.mkv");
        write_file(&source, b"original content");
        let done_path = temp_dir.path().join("no-such-dir").join("movie.mkv");

        let result = relocate_to_done(&source, &done_path);
        match result {
            Err(RelocateError::RenameFailed { from, to, .. }) => {
                assert_eq!(from, source);
                assert_eq!(to, done_path);
            }
            other => panic!("expected RenameFailed, got {:?}", other),
        }
        assert!(source.exists(), "original must stay in place");
    }
}
