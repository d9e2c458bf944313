//! Result types produced by the engine.
//!
//! A run yields exactly one [`ConversionResult`], whose variant matches the
//! renderer that was requested: a [`StructuredDocument`] block tree for JSON
//! output or a [`FlatDocument`] Markdown blob.

use serde_json::{Map, Value};

/// What the engine handed back for one document.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionResult {
    /// Block tree from the JSON renderer.
    Structured(StructuredDocument),
    /// Rendered text from the Markdown renderer.
    Flat(FlatDocument),
}

impl ConversionResult {
    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionResult::Structured(_) => "structured",
            ConversionResult::Flat(_) => "flat",
        }
    }

    pub fn as_structured(&self) -> Option<&StructuredDocument> {
        match self {
            ConversionResult::Structured(doc) => Some(doc),
            ConversionResult::Flat(_) => None,
        }
    }

    pub fn as_flat(&self) -> Option<&FlatDocument> {
        match self {
            ConversionResult::Flat(doc) => Some(doc),
            ConversionResult::Structured(_) => None,
        }
    }
}

impl From<StructuredDocument> for ConversionResult {
    fn from(doc: StructuredDocument) -> Self {
        ConversionResult::Structured(doc)
    }
}

impl From<FlatDocument> for ConversionResult {
    fn from(doc: FlatDocument) -> Self {
        ConversionResult::Flat(doc)
    }
}

/// Block tree as emitted by the engine's JSON renderer.
///
/// The root is kept as an ordered JSON object rather than a fixed struct:
/// block schemas differ between engine versions and any field we do not
/// strip must reach the output file unchanged and in its original order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuredDocument {
    root: Map<String, Value>,
}

impl StructuredDocument {
    pub fn new(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Wrap a parsed JSON value; returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(root) => Some(Self { root }),
            _ => None,
        }
    }

    /// Top-level blocks (usually one per page).
    pub fn children(&self) -> &[Value] {
        self.root
            .get("children")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn block_type(&self) -> Option<&str> {
        self.root.get("block_type").and_then(Value::as_str)
    }

    pub fn metadata(&self) -> Option<&Value> {
        self.root.get("metadata")
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Export to a plain nested mapping/sequence value, leaving `self`
    /// untouched.
    pub fn export(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}

/// Rendered Markdown for the whole document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatDocument {
    /// Text written verbatim to the output file.
    pub markdown: String,
    /// Engine-side metadata, if the engine produced any. Never persisted.
    pub metadata: Option<Value>,
}

impl FlatDocument {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
