//! # pdf2struct
//!
//! Convert a document into a clean JSON block tree or Markdown using an
//! external layout engine (`marker_single` by default).
//!
//! ## Why this crate?
//!
//! Layout engines produce excellent structure but also a lot of internal
//! detail: polygons and bounding boxes for every block, renderer bookkeeping
//! at the root. This crate runs the engine once, strips that detail, and
//! writes one artifact you can hand straight to downstream tools.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Config    merge format, output dir, engine options
//!  ├─ 2. Input     check the file exists and is readable
//!  ├─ 3. Engine    one blocking call, renderer fixed by the format
//!  ├─ 4. Sanitize  drop polygon/bbox everywhere, metadata/block_type at root
//!  └─ 5. Write     output.json / output.md, temp file + rename
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2struct::{convert_to_dir, ConversionConfig, Converter};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder("paper.pdf", "output")
//!         .output_format("json")
//!         .build()?;
//!     let path = convert_to_dir(&Converter::default(), &config).await?;
//!     println!("wrote {}", path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2struct` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AssistanceService, ConversionConfig, ConversionConfigBuilder, OutputFormat};
pub use convert::{convert, convert_sync, convert_to_dir, Converter};
pub use engine::{DocumentEngine, EngineKind, EngineRequest, MarkerEngine, Renderer};
pub use error::{ConfigError, EngineError, Pdf2StructError, WriteError};
pub use output::{ConversionResult, FlatDocument, StructuredDocument};
pub use pipeline::sanitize::{sanitize, Sanitizer};
pub use pipeline::write::{save, write_output};
