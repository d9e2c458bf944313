//! Pipeline integration tests with an in-process engine.
//!
//! The engine is replaced by [`FixtureEngine`], which hands back a canned
//! result for the requested renderer, so these tests exercise config → convert
//! → sanitize → write without any external tooling.

use pdf2struct::{
    convert_to_dir, save, sanitize, write_output, ConversionConfig, ConversionResult, Converter,
    DocumentEngine, EngineError, EngineRequest, FlatDocument, Pdf2StructError, Renderer,
    StructuredDocument, WriteError,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn hello_tree() -> Value {
    json!({
        "children": [{"text": "Hello", "block_type": "Text", "bbox": [0, 0, 1, 1]}],
        "metadata": {"page_count": 1}
    })
}

fn structured(value: Value) -> ConversionResult {
    StructuredDocument::from_value(value)
        .expect("fixture must be an object")
        .into()
}

fn flat(text: &str) -> ConversionResult {
    FlatDocument::new(text).into()
}

fn read_json(path: &Path) -> Value {
    let text = std::fs::read_to_string(path).expect("output file should exist");
    serde_json::from_str(&text).expect("output should be valid JSON")
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("readable dir")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Returns fixed results per renderer and counts calls.
struct FixtureEngine {
    tree: Value,
    markdown: String,
    calls: AtomicUsize,
}

impl FixtureEngine {
    fn new(tree: Value, markdown: &str) -> Arc<Self> {
        Arc::new(Self {
            tree,
            markdown: markdown.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

impl DocumentEngine for FixtureEngine {
    fn name(&self) -> &str {
        "fixture"
    }

    fn convert(&self, request: &EngineRequest) -> Result<ConversionResult, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match request.renderer {
            Renderer::Json => structured(self.tree.clone()),
            Renderer::Markdown => flat(&self.markdown),
        })
    }
}

/// Fails the way a crashed engine process would.
struct BrokenEngine;

impl DocumentEngine for BrokenEngine {
    fn name(&self) -> &str {
        "broken"
    }

    fn convert(&self, _request: &EngineRequest) -> Result<ConversionResult, EngineError> {
        Err(EngineError::ExitFailure {
            program: "broken".into(),
            status: "exit status: 1".into(),
            stderr: "model load failed".into(),
        })
    }
}

// ── Writer scenarios ─────────────────────────────────────────────────────────

#[test]
fn round_trip_structured_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("output.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    assert!(save(&structured(hello_tree()), &path));

    // Nested block types are content and stay; geometry and root metadata go.
    assert_eq!(
        read_json(&path),
        json!({"children": [{"text": "Hello", "block_type": "Text"}]})
    );
}

#[test]
fn flat_output_is_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.md");

    assert!(save(&flat("# Title\nBody"), &path));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Title\nBody");
}

#[test]
fn mismatched_suffix_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("output.json");
    let md_path = dir.path().join("output.md");

    assert!(!save(&flat("# Title"), &json_path));
    assert!(!save(&structured(hello_tree()), &md_path));
    assert!(dir_entries(dir.path()).is_empty(), "no file should be written");

    let err = write_output(&flat("# Title"), &json_path).unwrap_err();
    assert!(matches!(err, WriteError::FormatMismatch { .. }), "got {err:?}");
}

#[test]
fn unwritable_path_returns_false_without_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    // Parent is a regular file, so neither the temp file nor the target can
    // be created.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let path = blocker.join("output.json");

    assert!(!save(&structured(hello_tree()), &path));
    assert!(!path.exists());
    assert_eq!(dir_entries(dir.path()), ["blocker"]);
}

#[test]
fn missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent").join("output.md");

    let err = write_output(&flat("x"), &path).unwrap_err();
    assert!(matches!(err, WriteError::Io { .. }), "got {err:?}");
}

#[test]
fn sanitize_properties_hold_on_written_tree() {
    let tree = json!({
        "block_type": "Document",
        "metadata": {"table_of_contents": []},
        "children": [{
            "id": "/page/0/Page/0",
            "block_type": "Page",
            "polygon": [[0, 0], [1, 0], [1, 1], [0, 1]],
            "bbox": [0, 0, 1, 1],
            "children": [
                {"id": "/page/0/Text/1", "block_type": "Text", "html": "<p>a</p>", "bbox": [0, 0, 1, 1]},
                {"id": "/page/0/Table/2", "block_type": "Table", "html": "<table/>", "polygon": []}
            ],
            "section_hierarchy": {},
            "images": {}
        }]
    });

    let mut expected = tree.clone();
    sanitize(&mut expected);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output.json");
    assert!(save(&structured(tree), &path));

    let written = read_json(&path);
    assert_eq!(written, expected);

    let mut again = written.clone();
    sanitize(&mut again);
    assert_eq!(again, written, "sanitize must be idempotent");

    let page = &written["children"][0];
    assert_eq!(page["id"], "/page/0/Page/0");
    assert_eq!(page["children"][1]["html"], "<table/>");
    assert!(page.get("bbox").is_none());
    assert!(page["children"][0].get("bbox").is_none());
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[tokio::test]
async fn creates_missing_output_directory() {
    let input = tempfile::NamedTempFile::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("nested").join("output");
    assert!(!out_dir.exists());

    let engine = FixtureEngine::new(hello_tree(), "# Title\nBody");
    let config = ConversionConfig::builder(input.path(), &out_dir)
        .build()
        .unwrap();

    let written = convert_to_dir(&Converter::new(engine.clone()), &config)
        .await
        .unwrap();

    assert_eq!(written, out_dir.join("output.json"));
    assert!(out_dir.is_dir());
    assert!(written.is_file());
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn markdown_run_writes_md_file() {
    let input = tempfile::NamedTempFile::new().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let engine = FixtureEngine::new(hello_tree(), "# Title\nBody");
    let config = ConversionConfig::builder(input.path(), dir.path())
        .output_format("markdown")
        .build()
        .unwrap();

    let written = convert_to_dir(&Converter::new(engine), &config)
        .await
        .unwrap();

    assert_eq!(written, dir.path().join("output.md"));
    assert_eq!(std::fs::read_to_string(&written).unwrap(), "# Title\nBody");
    assert_eq!(dir_entries(dir.path()), ["output.md"]);
}

#[tokio::test]
async fn engine_failure_writes_nothing() {
    let input = tempfile::NamedTempFile::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = ConversionConfig::builder(input.path(), dir.path())
        .build()
        .unwrap();

    let err = convert_to_dir(&Converter::new(Arc::new(BrokenEngine)), &config)
        .await
        .unwrap_err();

    match err {
        Pdf2StructError::Engine(EngineError::ExitFailure { stderr, .. }) => {
            assert_eq!(stderr, "model load failed")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn converter_is_reusable_across_documents() {
    let first = tempfile::NamedTempFile::new().unwrap();
    let second = tempfile::NamedTempFile::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let engine = FixtureEngine::new(hello_tree(), "# Title\nBody");
    let converter = Converter::new(engine.clone());

    let json_cfg = ConversionConfig::builder(first.path(), dir.path().join("a"))
        .build()
        .unwrap();
    let md_cfg = ConversionConfig::builder(second.path(), dir.path().join("b"))
        .output_format("markdown")
        .build()
        .unwrap();

    let a = convert_to_dir(&converter, &json_cfg).await.unwrap();
    let b = convert_to_dir(&converter, &md_cfg).await.unwrap();

    assert_eq!(read_json(&a), json!({"children": [{"text": "Hello", "block_type": "Text"}]}));
    assert_eq!(std::fs::read_to_string(&b).unwrap(), "# Title\nBody");
    assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn blocking_conversion_then_save() {
    let input = tempfile::NamedTempFile::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let engine = FixtureEngine::new(hello_tree(), "# Title\nBody");
    let config = ConversionConfig::builder(input.path(), dir.path())
        .build()
        .unwrap();

    let result = Converter::new(engine).convert_blocking(&config).unwrap();
    let path: PathBuf = config.output_path();
    assert!(save(&result, &path));
    assert_eq!(
        read_json(&path),
        json!({"children": [{"text": "Hello", "block_type": "Text"}]})
    );
}

#[test]
fn runs_on_tokio_test_runtime() {
    let input = tempfile::NamedTempFile::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let engine = FixtureEngine::new(hello_tree(), "# T");
    let config = ConversionConfig::builder(input.path(), dir.path())
        .output_format("md")
        .build()
        .unwrap();

    let result = tokio_test::block_on(Converter::new(engine).convert(&config)).unwrap();
    assert_eq!(result.as_flat().unwrap().markdown, "# T");
}
