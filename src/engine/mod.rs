//! The document-parsing engine, seen from this crate.
//!
//! Layout analysis, OCR, model loading and the optional language-model pass
//! all happen inside an external engine. This module reduces it to one
//! capability, [`DocumentEngine::convert`], so the rest of the pipeline never
//! depends on how a particular engine is driven.
//!
//! Engines are chosen explicitly through [`EngineKind`] (or by handing any
//! `Arc<dyn DocumentEngine>` to [`crate::convert::Converter::new`]); there is
//! no lookup by name.

pub mod marker;

use crate::config::OutputFormat;
use crate::error::EngineError;
use crate::output::ConversionResult;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

pub use marker::{MarkerEngine, DEFAULT_MARKER_PROGRAM};

/// One engine call: which file, which renderer, which options.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    /// Resolved, readable input file.
    pub input: PathBuf,
    /// Renderer the engine must run; fixes the result variant.
    pub renderer: Renderer,
    /// Merged option map, see [`crate::config::ConversionConfig::engine_options`].
    pub options: Map<String, Value>,
}

/// Renderer selection passed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    /// Block tree, returned as [`ConversionResult::Structured`].
    Json,
    /// Rendered text, returned as [`ConversionResult::Flat`].
    Markdown,
}

impl Renderer {
    pub fn as_str(self) -> &'static str {
        match self {
            Renderer::Json => "json",
            Renderer::Markdown => "markdown",
        }
    }

    /// Variant name the renderer produces, matching [`ConversionResult::kind`].
    pub fn result_kind(self) -> &'static str {
        match self {
            Renderer::Json => "structured",
            Renderer::Markdown => "flat",
        }
    }

    pub fn produced(self, result: &ConversionResult) -> bool {
        matches!(
            (self, result),
            (Renderer::Json, ConversionResult::Structured(_))
                | (Renderer::Markdown, ConversionResult::Flat(_))
        )
    }
}

impl From<OutputFormat> for Renderer {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Renderer::Json,
            OutputFormat::Markdown => Renderer::Markdown,
        }
    }
}

/// An external document-parsing engine.
///
/// `convert` is blocking and may take minutes; callers on an async runtime
/// should move it off the executor (as [`crate::convert::Converter`] does).
/// Implementations must not keep per-document state between calls.
pub trait DocumentEngine: Send + Sync {
    /// Human-readable engine name for logs.
    fn name(&self) -> &str;

    /// Convert one document with the requested renderer.
    fn convert(&self, request: &EngineRequest) -> Result<ConversionResult, EngineError>;
}

/// Explicit engine selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineKind {
    /// `marker_single` (or a compatible command) run as a child process.
    Marker {
        program: PathBuf,
        /// Arguments placed before the input path, e.g. a script for `python`.
        args: Vec<String>,
    },
}

impl Default for EngineKind {
    fn default() -> Self {
        EngineKind::Marker {
            program: PathBuf::from(DEFAULT_MARKER_PROGRAM),
            args: Vec::new(),
        }
    }
}

impl EngineKind {
    /// Construct the engine this kind describes.
    pub fn build(self) -> Arc<dyn DocumentEngine> {
        match self {
            EngineKind::Marker { program, args } => {
                Arc::new(MarkerEngine::new(program).args(args))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{FlatDocument, StructuredDocument};

    #[test]
    fn renderer_follows_output_format() {
        assert_eq!(Renderer::from(OutputFormat::Json), Renderer::Json);
        assert_eq!(Renderer::from(OutputFormat::Markdown), Renderer::Markdown);
    }

    #[test]
    fn renderer_checks_variant() {
        let flat: ConversionResult = FlatDocument::new("x").into();
        let tree: ConversionResult = StructuredDocument::default().into();

        assert!(Renderer::Markdown.produced(&flat));
        assert!(!Renderer::Markdown.produced(&tree));
        assert!(Renderer::Json.produced(&tree));
        assert!(!Renderer::Json.produced(&flat));
        assert_eq!(Renderer::Json.result_kind(), tree.kind());
        assert_eq!(Renderer::Markdown.result_kind(), flat.kind());
    }

    #[test]
    fn default_kind_builds_marker() {
        let engine = EngineKind::default().build();
        assert_eq!(engine.name(), DEFAULT_MARKER_PROGRAM);
    }
}
