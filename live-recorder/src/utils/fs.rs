//! Filesystem helpers for recording output.
//!
//! These helpers attach the operation and path to IO errors so a failed
//! attempt logs something actionable.

use std::path::{Path, PathBuf};

use crate::utils::filename::recording_file_name;
use crate::{Error, Result};

/// Convert an IO error into an application error with operation + path context.
pub fn io_error(op: &'static str, path: &Path, source: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(
        source.kind(),
        format!("{op} {}: {source}", path.display()),
    ))
}

/// Ensure a directory exists, creating it (recursively) if needed.
pub async fn ensure_dir_all(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| io_error("creating directory", path, e))
}

/// Ensure a directory exists (synchronous variant) with a custom operation label.
pub fn ensure_dir_all_sync_with_op(op: &'static str, path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| io_error(op, path, e))
}

/// First path in `dir` named after `stem` that does not exist yet.
pub async fn next_free_path(dir: &Path, stem: &str, ext: &str) -> Result<PathBuf> {
    let mut index = 0;
    loop {
        let candidate = dir.join(recording_file_name(stem, index, ext));
        let exists = tokio::fs::try_exists(&candidate)
            .await
            .map_err(|e| io_error("checking file", &candidate, e))?;
        if !exists {
            return Ok(candidate);
        }
        index += 1;
    }
}

/// Deletes `path` if it is an empty file. Returns whether it was removed.
///
/// A missing file is not an error.
pub async fn remove_if_empty(path: &Path) -> Result<bool> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(io_error("reading metadata of", path, e)),
    };

    if !metadata.is_file() || metadata.len() > 0 {
        return Ok(false);
    }

    tokio::fs::remove_file(path)
        .await
        .map_err(|e| io_error("removing empty file", path, e))?;
    Ok(true)
}
