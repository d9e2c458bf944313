//! Output persistence: one result, one file, written atomically.
//!
//! The branch is chosen from the target path's suffix: `.json` selects the
//! structured branch, anything else the flat branch. When the result variant
//! does not fit the branch the write fails with
//! [`WriteError::FormatMismatch`] instead of producing a half-right file.
//! Paths built by [`crate::config::ConversionConfig::output_path`] always
//! agree with the requested variant, so a mismatch means a caller bypassed
//! the config.
//!
//! Writes go to a temp file in the destination directory which is then
//! renamed over the target, so a failed run never leaves a truncated file.

use crate::config::OutputFormat;
use crate::error::WriteError;
use crate::output::ConversionResult;
use crate::pipeline::sanitize::sanitize;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

const JSON_INDENT: &[u8] = b"    ";

/// Write `result` to `path` and report success as a boolean.
///
/// The underlying error is logged, never returned. Use [`write_output`]
/// when the caller needs to know what failed.
pub fn save(result: &ConversionResult, path: impl AsRef<Path>) -> bool {
    match write_output(result, path.as_ref()) {
        Ok(_) => true,
        Err(e) => {
            error!("{}", e);
            false
        }
    }
}

/// Write `result` to `path`, routing on the path's suffix.
///
/// Overwrites any existing file. Returns the path written.
pub fn write_output(result: &ConversionResult, path: &Path) -> Result<PathBuf, WriteError> {
    let bytes = match (OutputFormat::from_path(path), result) {
        (OutputFormat::Json, ConversionResult::Structured(doc)) => {
            let mut tree = doc.export();
            sanitize(&mut tree);
            to_json_bytes(&tree, path)?
        }
        (OutputFormat::Markdown, ConversionResult::Flat(doc)) => doc.markdown.as_bytes().to_vec(),
        (OutputFormat::Json, other) => {
            return Err(WriteError::FormatMismatch {
                path: path.to_path_buf(),
                expected: "structured",
                found: other.kind(),
            })
        }
        (OutputFormat::Markdown, other) => {
            return Err(WriteError::FormatMismatch {
                path: path.to_path_buf(),
                expected: "flat",
                found: other.kind(),
            })
        }
    };

    write_atomic(path, &bytes)?;
    info!("Output saved to {}", path.display());
    Ok(path.to_path_buf())
}

/// Serialise with 4-space indentation, keeping field order.
fn to_json_bytes(tree: &Value, path: &Path) -> Result<Vec<u8>, WriteError> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(JSON_INDENT));
    tree.serialize(&mut ser).map_err(|e| WriteError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(buf)
}

/// Atomic write: temp file in the target directory, then rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let io_err = |source: std::io::Error| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".pdf2struct-").suffix(".tmp");
    // tempfile defaults to 0600; ask for 0666 so the umask decides, like a
    // plain create.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(io_err)?;

    // An overwritten file keeps its mode.
    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(io_err)?;
    }

    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    debug!("Wrote {} bytes to {}", bytes.len(), tmp.path().display());

    // On failure the temp file is dropped and deleted with the error.
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
