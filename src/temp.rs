//! Working directories for git snapshots
//!
//! Each resolution owns its snapshot directory exclusively. The directory is a
//! [`TempDir`], so it is deleted when the snapshot is dropped on any exit path.

use std::env;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::error::{ResolveError, Result};

const SNAPSHOT_PREFIX: &str = "bundle-resolver-";

/// Returns a directory path suitable for creating temporary directories.
///
/// Never returns a relative path, so snapshots are never created under the
/// current working directory (e.g. when `TMPDIR=tmp`).
pub fn temp_dir_base() -> PathBuf {
    let t = env::temp_dir();
    if t.is_absolute() {
        t
    } else {
        #[cfg(windows)]
        {
            env::var("TEMP")
                .or_else(|_| env::var("TMP"))
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("C:\\Windows\\Temp"))
        }
        #[cfg(not(windows))]
        {
            PathBuf::from("/tmp")
        }
    }
}

/// Create a fresh, exclusively owned snapshot directory
pub fn snapshot_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(SNAPSHOT_PREFIX)
        .tempdir_in(temp_dir_base())
        .map_err(|e| ResolveError::IoError {
            message: format!("Failed to create snapshot directory: {e}"),
        })
}
