use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::errors::StatbenchError;
use crate::types::FileMetadata;

/// Follows symlinks, like stat(2).
pub fn stat_path(path: &Path) -> Result<FileMetadata, StatbenchError> {
    let metadata = fs::metadata(path).map_err(|source| StatbenchError::StatFailed {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(FileMetadata {
        size: metadata.len(),
        is_file: metadata.is_file(),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
    })
}

/// Create (or truncate) each target and extend it to `size` bytes.
pub fn prepare_targets(targets: &[PathBuf], size: u64) -> Result<(), StatbenchError> {
    for path in targets {
        let setup_err = |source| StatbenchError::TargetSetupError {
            path: path.clone(),
            source,
        };
        let file = fs::File::create(path).map_err(setup_err)?;
        file.set_len(size).map_err(setup_err)?;
        tracing::debug!(path = %path.display(), size, "created target file");
    }
    Ok(())
}

/// Remove targets, ignoring ones that are already gone.
pub fn cleanup_targets(targets: &[PathBuf]) {
    for path in targets {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed target file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove target file"),
        }
    }
}
