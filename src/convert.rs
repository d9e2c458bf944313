//! Conversion entry points.
//!
//! [`Converter`] owns the engine handle and issues exactly one engine call per
//! [`Converter::convert`]. There is no retry, batching or caching: a failed
//! engine call fails the run and nothing is written.
//!
//! The renderer is chosen from the config's [`crate::config::OutputFormat`]
//! before the engine runs, so the variant of the returned
//! [`ConversionResult`] is known in advance and checked on the way out.

use crate::config::ConversionConfig;
use crate::engine::{DocumentEngine, EngineKind, EngineRequest, Renderer};
use crate::error::{EngineError, Pdf2StructError, WriteError};
use crate::output::ConversionResult;
use crate::pipeline::{input, write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Drives one engine, one document at a time.
///
/// Cheap to clone; clones share the engine handle. No per-document state is
/// kept, so the same converter can be reused for unrelated documents.
#[derive(Clone)]
pub struct Converter {
    engine: Arc<dyn DocumentEngine>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::from_kind(EngineKind::default())
    }
}

impl Converter {
    pub fn new(engine: Arc<dyn DocumentEngine>) -> Self {
        Self { engine }
    }

    pub fn from_kind(kind: EngineKind) -> Self {
        Self::new(kind.build())
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Build the engine request for `config`, checking the input first.
    fn request(&self, config: &ConversionConfig) -> Result<EngineRequest, EngineError> {
        let input = input::resolve_local(&config.input)?;
        Ok(EngineRequest {
            input,
            renderer: Renderer::from(config.output_format),
            options: config.engine_options(),
        })
    }

    /// Convert the document named by `config`.
    ///
    /// The blocking engine call runs on tokio's blocking pool.
    ///
    /// # Errors
    /// Any [`EngineError`]: unreadable input, engine failure, or a result
    /// variant that does not match the requested output format.
    pub async fn convert(&self, config: &ConversionConfig) -> Result<ConversionResult, EngineError> {
        let start = Instant::now();
        info!(
            "Starting conversion: {} → {} via {}",
            config.input.display(),
            config.output_format,
            self.engine.name()
        );

        let request = self.request(config)?;
        let renderer = request.renderer;
        let engine = Arc::clone(&self.engine);

        let result = tokio::task::spawn_blocking(move || engine.convert(&request))
            .await
            .map_err(|e| EngineError::Internal(format!("Engine task panicked: {}", e)))??;

        finish(renderer, result, start)
    }

    /// Blocking variant of [`convert`](Self::convert) for callers without a
    /// runtime.
    pub fn convert_blocking(
        &self,
        config: &ConversionConfig,
    ) -> Result<ConversionResult, EngineError> {
        let start = Instant::now();
        info!(
            "Starting conversion: {} → {} via {}",
            config.input.display(),
            config.output_format,
            self.engine.name()
        );

        let request = self.request(config)?;
        let result = self.engine.convert(&request)?;
        finish(request.renderer, result, start)
    }
}

fn finish(
    renderer: Renderer,
    result: ConversionResult,
    start: Instant,
) -> Result<ConversionResult, EngineError> {
    if !renderer.produced(&result) {
        return Err(EngineError::UnexpectedVariant {
            expected: renderer.result_kind(),
            found: result.kind(),
        });
    }
    info!(
        "Conversion complete: {} result in {}ms",
        result.kind(),
        start.elapsed().as_millis()
    );
    Ok(result)
}

/// Convert with the default engine (`marker_single` on `PATH`).
pub async fn convert(config: &ConversionConfig) -> Result<ConversionResult, EngineError> {
    Converter::default().convert(config).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(config: &ConversionConfig) -> Result<ConversionResult, EngineError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| EngineError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(config))
}

/// Convert and write the result to [`ConversionConfig::output_path`].
///
/// Creates the output directory (with parents) before the engine runs and
/// writes atomically. Returns the path written.
pub async fn convert_to_dir(
    converter: &Converter,
    config: &ConversionConfig,
) -> Result<PathBuf, Pdf2StructError> {
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|source| WriteError::Io {
            path: config.output_dir.clone(),
            source,
        })?;
    debug!("Output directory ready: {}", config.output_dir.display());

    let result = converter.convert(config).await?;

    let path = config.output_path();
    let written = tokio::task::spawn_blocking(move || write::write_output(&result, &path))
        .await
        .map_err(|e| EngineError::Internal(format!("Write task panicked: {}", e)))??;
    Ok(written)
}
