//! Input resolution: check the user-supplied path before the engine runs.
//!
//! The engine would discover a missing file too, but only after loading its
//! models, which can take tens of seconds. Checking up front turns a typo into
//! an immediate, specific error.

use crate::error::EngineError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve a local input path, validating existence and read access.
pub fn resolve_local(path: &Path) -> Result<PathBuf, EngineError> {
    let path = path.to_path_buf();

    let meta = match std::fs::metadata(&path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(EngineError::PermissionDenied { path });
        }
        Err(_) => return Err(EngineError::InputNotFound { path }),
    };

    if !meta.is_file() {
        return Err(EngineError::NotAFile { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(EngineError::PermissionDenied { path });
        }
        Err(_) => return Err(EngineError::InputNotFound { path }),
    }

    debug!("Resolved local input: {}", path.display());
    Ok(path)
}
