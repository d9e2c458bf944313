//! Error types for the pdf2struct library.
//!
//! Each stage of the pipeline owns its own error type so callers can tell
//! *where* a run went wrong without string matching:
//!
//! * [`ConfigError`]: the options themselves are unusable. Raised by
//!   [`crate::config::ConversionConfigBuilder::build`] before any I/O.
//!
//! * [`EngineError`]: **Fatal.** The external engine could not produce a
//!   result (missing input, engine not installed, crash, garbage output).
//!   Nothing is written to disk when this happens.
//!
//! * [`WriteError`]: the result exists but could not be persisted. The
//!   writer reports it as a value; [`crate::pipeline::write::save`] folds it
//!   into a boolean for callers that only want pass/fail.
//!
//! [`Pdf2StructError`] wraps all three for the one-shot entry points.

use std::path::PathBuf;
use thiserror::Error;

/// Umbrella error returned by [`crate::convert::convert_to_dir`].
#[derive(Debug, Error)]
pub enum Pdf2StructError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// The conversion options are malformed or incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No input path was given.
    #[error("Input path is empty")]
    MissingInput,

    /// No output directory was given.
    #[error("Output directory is empty")]
    MissingOutputDir,

    /// The output format is neither `json` nor `markdown`.
    #[error("Unsupported output format '{value}'\nExpected one of: json, markdown.")]
    UnsupportedOutputFormat { value: String },

    /// The page range does not follow the `0,5-10,20` syntax.
    #[error("Invalid page range '{value}': {reason}")]
    InvalidPageRange { value: String, reason: String },

    /// An assistance service was enabled without the setting it needs.
    #[error("Assistance service '{service}' is missing '{setting}'")]
    MissingServiceSetting { service: String, setting: String },

    /// A passthrough key collides with a typed option.
    #[error("Option '{key}' is reserved; use the dedicated setter instead")]
    ReservedKey { key: String },
}

/// The external engine failed during load, parsing, or rendering.
#[derive(Debug, Error)]
pub enum EngineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input path points at a directory or other non-file.
    #[error("Input '{path}' is not a regular file")]
    NotAFile { path: PathBuf },

    // ── Engine process errors ─────────────────────────────────────────────
    /// The engine executable could not be started.
    #[error("Failed to start engine '{program}': {source}\nIs it installed and on PATH?")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but reported failure.
    #[error("Engine '{program}' exited with {status}\n{stderr}")]
    ExitFailure {
        program: String,
        status: String,
        stderr: String,
    },

    /// The engine claimed success but its output file is missing.
    #[error("Engine produced no output at '{path}'")]
    MissingOutput { path: PathBuf },

    /// The engine output could not be read or decoded.
    #[error("Engine output '{path}' is invalid: {detail}")]
    InvalidOutput { path: PathBuf, detail: String },

    /// The engine returned a different variant from the one requested.
    #[error("Engine returned {found} output but {expected} was requested")]
    UnexpectedVariant {
        expected: &'static str,
        found: &'static str,
    },

    /// Scratch space for the engine could not be prepared.
    #[error("Failed to prepare engine workspace: {source}")]
    Workspace {
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Structured export or file write failed.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The branch chosen from the file suffix cannot handle this result.
    #[error("Cannot write {found} output to '{path}': the file suffix selects {expected} output")]
    FormatMismatch {
        path: PathBuf,
        expected: &'static str,
        found: &'static str,
    },

    /// The tree could not be serialised to JSON.
    #[error("Failed to serialise output for '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Could not create, write, or rename the output file.
    #[error("Failed to write output file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
