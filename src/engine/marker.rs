//! Engine backed by the `marker_single` command-line converter.
//!
//! Each call gets its own scratch directory:
//!
//! ```text
//! <tmp>/config.json            merged option map (--config_json)
//! <tmp>/out/<stem>/<stem>.json  JSON renderer output
//! <tmp>/out/<stem>/<stem>.md    Markdown renderer output
//! <tmp>/out/<stem>/<stem>_meta.json
//! ```
//!
//! The directory is removed when the call returns, so nothing leaks between
//! documents. Options the converter only honours as command-line flags
//! (page range, LLM service selection) are passed both ways.

use crate::engine::{DocumentEngine, EngineRequest, Renderer};
use crate::error::EngineError;
use crate::output::{ConversionResult, FlatDocument, StructuredDocument};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Executable looked up on `PATH` when no program is configured.
pub const DEFAULT_MARKER_PROGRAM: &str = "marker_single";

/// Options forwarded as explicit flags in addition to the config file.
const FLAG_OPTIONS: &[&str] = &[
    "page_range",
    "use_llm",
    "llm_service",
    "ollama_base_url",
    "ollama_model",
];

/// Lines of engine stderr kept in [`EngineError::ExitFailure`].
const STDERR_TAIL_LINES: usize = 20;

/// Runs `marker_single` as a child process, one process per document.
#[derive(Debug, Clone)]
pub struct MarkerEngine {
    program: PathBuf,
    name: String,
    args: Vec<String>,
}

impl MarkerEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program.display().to_string();
        Self {
            program,
            name,
            args: Vec::new(),
        }
    }

    /// Add an argument placed before the input path.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Full argument list for one run.
    fn command_args(
        &self,
        request: &EngineRequest,
        out_dir: &Path,
        config_path: &Path,
    ) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(request.input.to_string_lossy().into_owned());
        args.push("--output_format".into());
        args.push(request.renderer.as_str().into());
        args.push("--output_dir".into());
        args.push(out_dir.to_string_lossy().into_owned());

        for key in FLAG_OPTIONS {
            match request.options.get(*key) {
                Some(Value::Bool(true)) => args.push(format!("--{key}")),
                Some(Value::Bool(false)) | Some(Value::Null) | None => {}
                Some(Value::String(s)) => {
                    args.push(format!("--{key}"));
                    args.push(s.clone());
                }
                Some(other) => {
                    args.push(format!("--{key}"));
                    args.push(other.to_string());
                }
            }
        }

        args.push("--config_json".into());
        args.push(config_path.to_string_lossy().into_owned());
        args
    }
}

impl DocumentEngine for MarkerEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn convert(&self, request: &EngineRequest) -> Result<ConversionResult, EngineError> {
        let workspace = tempfile::Builder::new()
            .prefix("pdf2struct-")
            .tempdir()
            .map_err(|source| EngineError::Workspace { source })?;
        let out_dir = workspace.path().join("out");
        std::fs::create_dir_all(&out_dir).map_err(|source| EngineError::Workspace { source })?;

        // The engine writes into scratch space; the caller's output directory
        // is only touched by the writer.
        let mut options = request.options.clone();
        options.insert("output_format".into(), Value::from(request.renderer.as_str()));
        options.insert(
            "output_dir".into(),
            Value::from(out_dir.to_string_lossy().into_owned()),
        );
        let config_path = workspace.path().join("config.json");
        let config_json = serde_json::to_vec_pretty(&options)
            .map_err(|e| EngineError::Internal(format!("engine options: {e}")))?;
        std::fs::write(&config_path, config_json)
            .map_err(|source| EngineError::Workspace { source })?;

        let args = self.command_args(request, &out_dir, &config_path);
        debug!("Running {} {}", self.name, args.join(" "));

        let start = Instant::now();
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| EngineError::SpawnFailed {
                program: self.name.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("{} failed with {}", self.name, output.status);
            return Err(EngineError::ExitFailure {
                program: self.name.clone(),
                status: output.status.to_string(),
                stderr: stderr_tail(&stderr),
            });
        }
        info!(
            "{} finished in {}ms",
            self.name,
            start.elapsed().as_millis()
        );

        let stem = request
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let doc_dir = out_dir.join(&stem);
        let metadata = read_metadata(&doc_dir.join(format!("{stem}_meta.json")));

        match request.renderer {
            Renderer::Json => read_structured(&doc_dir.join(format!("{stem}.json")), metadata),
            Renderer::Markdown => read_flat(&doc_dir.join(format!("{stem}.md")), metadata),
        }
    }
}

fn read_structured(path: &Path, metadata: Option<Value>) -> Result<ConversionResult, EngineError> {
    let bytes = read_output(path)?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| EngineError::InvalidOutput {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let Value::Object(mut root) = value else {
        return Err(EngineError::InvalidOutput {
            path: path.to_path_buf(),
            detail: "top-level value is not an object".into(),
        });
    };

    // The JSON file is written without metadata; restore it from the
    // sidecar so the tree matches what the renderer produced in memory.
    if let Some(meta) = metadata {
        if !root.contains_key("metadata") {
            root.insert("metadata".into(), meta);
        }
    }

    debug!("Read block tree with {} top-level fields", root.len());
    Ok(StructuredDocument::new(root).into())
}

fn read_flat(path: &Path, metadata: Option<Value>) -> Result<ConversionResult, EngineError> {
    let bytes = read_output(path)?;
    let markdown = String::from_utf8(bytes).map_err(|e| EngineError::InvalidOutput {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut doc = FlatDocument::new(markdown);
    doc.metadata = metadata;
    Ok(doc.into())
}

fn read_output(path: &Path) -> Result<Vec<u8>, EngineError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EngineError::MissingOutput {
            path: path.to_path_buf(),
        },
        _ => EngineError::InvalidOutput {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })
}

/// Sidecar metadata is best-effort; a missing or broken file is ignored.
fn read_metadata(path: &Path) -> Option<Value> {
    let bytes = std::fs::read(path).ok()?;
    match serde_json::from_slice::<Map<String, Value>>(&bytes) {
        Ok(map) => Some(Value::Object(map)),
        Err(e) => {
            warn!("Ignoring unreadable metadata {}: {}", path.display(), e);
            None
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(renderer: Renderer, options: Value) -> EngineRequest {
        EngineRequest {
            input: PathBuf::from("/docs/data.pdf"),
            renderer,
            options: options.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn args_carry_renderer_and_flags() {
        let engine = MarkerEngine::new("marker_single");
        let req = request(
            Renderer::Json,
            json!({
                "page_range": "1",
                "use_llm": true,
                "llm_service": "marker.services.ollama.OllamaService",
                "ollama_model": "llama3.1:8b",
                "ADDITIONAL_KEY": "VALUE"
            }),
        );
        let args = engine.command_args(&req, Path::new("/tmp/out"), Path::new("/tmp/config.json"));

        assert_eq!(
            args,
            [
                "/docs/data.pdf",
                "--output_format",
                "json",
                "--output_dir",
                "/tmp/out",
                "--page_range",
                "1",
                "--use_llm",
                "--llm_service",
                "marker.services.ollama.OllamaService",
                "--ollama_model",
                "llama3.1:8b",
                "--config_json",
                "/tmp/config.json",
            ]
        );
    }

    #[test]
    fn false_flags_are_omitted() {
        let engine = MarkerEngine::new("marker_single").arg("-q");
        let req = request(Renderer::Markdown, json!({"use_llm": false}));
        let args = engine.command_args(&req, Path::new("o"), Path::new("c.json"));

        assert_eq!(args[0], "-q");
        assert!(!args.iter().any(|a| a == "--use_llm"));
        assert!(args.windows(2).any(|w| w == ["--output_format", "markdown"]));
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let stderr: String = (0..30).map(|i| format!("line {i}\n")).collect();
        let tail = stderr_tail(&stderr);
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let input = tempfile::NamedTempFile::new().unwrap();
        let engine = MarkerEngine::new("/nonexistent/bin/marker_single");
        let req = EngineRequest {
            input: input.path().to_path_buf(),
            renderer: Renderer::Json,
            options: Map::new(),
        };
        let err = engine.convert(&req).unwrap_err();
        assert!(matches!(err, EngineError::SpawnFailed { .. }), "got {err:?}");
    }

    #[test]
    fn structured_output_gets_sidecar_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("doc.json");
        std::fs::write(&json_path, r#"{"children": [], "block_type": "Document"}"#).unwrap();

        let result = read_structured(&json_path, Some(json!({"page_stats": []}))).unwrap();
        let doc = result.as_structured().unwrap();
        assert_eq!(doc.metadata(), Some(&json!({"page_stats": []})));
        assert_eq!(doc.block_type(), Some("Document"));
    }

    #[test]
    fn non_object_json_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("doc.json");
        std::fs::write(&json_path, "[1, 2, 3]").unwrap();

        let err = read_structured(&json_path, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidOutput { .. }), "got {err:?}");
    }

    #[test]
    fn absent_output_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_flat(&dir.path().join("doc.md"), None).unwrap_err();
        assert!(matches!(err, EngineError::MissingOutput { .. }), "got {err:?}");
    }
}
