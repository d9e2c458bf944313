//! Configuration types for a single document conversion.
//!
//! Every option a run needs lives in [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. The typed fields cover what this crate itself
//! acts on (where to read, what to produce, where to write); everything else
//! is an engine concern and travels through [`ConversionConfig::extra`]
//! untouched.
//!
//! # One source of truth for the output format
//! [`OutputFormat`] decides both the renderer the engine is asked for and the
//! suffix of the output file, so the two can never disagree.

use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default Ollama endpoint used when the assistance service is enabled.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434/";

/// Default Ollama model used when the assistance service is enabled.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.1:8b";

/// Service locator the engine expects for the Ollama backend.
pub const OLLAMA_SERVICE_LOCATOR: &str = "marker.services.ollama.OllamaService";

/// Option names owned by typed fields; passthrough keys may not use them.
const RESERVED_KEYS: &[&str] = &[
    "output_format",
    "output_dir",
    "page_range",
    "use_llm",
    "llm_service",
    "ollama_base_url",
    "ollama_model",
    "config_json",
];

static PAGE_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(-\d+)?(,\d+(-\d+)?)*$").expect("valid page range regex"));

/// Configuration for one conversion run.
///
/// Built via [`ConversionConfig::builder()`].
///
/// # Example
/// ```rust
/// use pdf2struct::{ConversionConfig, OutputFormat};
///
/// let config = ConversionConfig::builder("paper.pdf", "output")
///     .output_format("markdown")
///     .page_range("0-4")
///     .set("disable_image_extraction", true)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.output_format, OutputFormat::Markdown);
/// assert!(config.output_path().ends_with("output.md"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    /// Document to convert. Existence is checked by the pipeline, not here.
    pub input: PathBuf,

    /// Requested output shape. Default: [`OutputFormat::Json`].
    pub output_format: OutputFormat,

    /// Directory the output file is written into. Default: `output`.
    pub output_dir: PathBuf,

    /// Engine page range, 0-indexed: `"0"`, `"0-4"`, `"0,5-10,20"`.
    /// `None` converts every page.
    pub page_range: Option<String>,

    /// Optional language-model service the engine may use to refine output.
    pub assistance: AssistanceService,

    /// Engine-specific options forwarded verbatim.
    pub extra: BTreeMap<String, Value>,
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder(
        input: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            input: input.into(),
            output_dir: output_dir.into(),
            output_format: OutputFormat::default().as_str().to_string(),
            page_range: None,
            assistance: AssistanceService::default(),
            extra: BTreeMap::new(),
        }
    }

    /// Where the artifact of this run is written: `<output_dir>/output.<ext>`.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(self.output_format.file_name())
    }

    /// Flatten the config into the option map handed to the engine.
    ///
    /// Typed options come first in a fixed order, passthrough keys follow in
    /// key order.
    pub fn engine_options(&self) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert(
            "output_format".into(),
            Value::from(self.output_format.as_str()),
        );
        options.insert(
            "output_dir".into(),
            Value::from(self.output_dir.to_string_lossy().into_owned()),
        );
        if let Some(ref range) = self.page_range {
            options.insert("page_range".into(), Value::from(range.as_str()));
        }
        self.assistance.write_options(&mut options);
        for (key, value) in &self.extra {
            options.insert(key.clone(), value.clone());
        }
        options
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug, Clone)]
pub struct ConversionConfigBuilder {
    input: PathBuf,
    output_dir: PathBuf,
    output_format: String,
    page_range: Option<String>,
    assistance: AssistanceService,
    extra: BTreeMap<String, Value>,
}

impl ConversionConfigBuilder {
    /// Free-form format name; validated in [`build`](Self::build).
    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.output_format = format.as_str().to_string();
        self
    }

    pub fn page_range(mut self, range: impl Into<String>) -> Self {
        self.page_range = Some(range.into());
        self
    }

    pub fn assistance(mut self, service: AssistanceService) -> Self {
        self.assistance = service;
        self
    }

    /// Shorthand for [`AssistanceService::Ollama`].
    pub fn ollama(self, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        self.assistance(AssistanceService::Ollama {
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    /// Add an engine-specific passthrough option.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConfigError> {
        if self.input.as_os_str().is_empty() {
            return Err(ConfigError::MissingInput);
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingOutputDir);
        }

        let output_format: OutputFormat = self.output_format.parse()?;

        let page_range = match self.page_range {
            Some(range) => Some(validate_page_range(&range)?),
            None => None,
        };

        self.assistance.validate()?;

        if let Some(key) = self
            .extra
            .keys()
            .find(|k| RESERVED_KEYS.contains(&k.as_str()))
        {
            return Err(ConfigError::ReservedKey { key: key.clone() });
        }

        Ok(ConversionConfig {
            input: self.input,
            output_format,
            output_dir: self.output_dir,
            page_range,
            assistance: self.assistance,
            extra: self.extra,
        })
    }
}

/// Check a page range and return it with whitespace removed.
fn validate_page_range(raw: &str) -> Result<String, ConfigError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let invalid = |reason: &str| ConfigError::InvalidPageRange {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    if compact.is_empty() {
        return Err(invalid("range is empty"));
    }
    if !PAGE_RANGE_RE.is_match(&compact) {
        return Err(invalid("expected pages like 0, 0-4 or 0,5-10,20"));
    }

    for part in compact.split(',') {
        if let Some((start, end)) = part.split_once('-') {
            let start: u64 = start.parse().map_err(|_| invalid("page number too large"))?;
            let end: u64 = end.parse().map_err(|_| invalid("page number too large"))?;
            if start > end {
                return Err(invalid(&format!("{start}-{end}: start must be <= end")));
            }
        } else {
            part.parse::<u64>()
                .map_err(|_| invalid("page number too large"))?;
        }
    }

    Ok(compact)
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The two output shapes the pipeline knows how to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// Nested block tree, sanitised and written as `output.json`. (default)
    #[default]
    Json,
    /// Rendered Markdown, written verbatim as `output.md`.
    Markdown,
}

impl OutputFormat {
    /// Name the engine understands.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "md",
        }
    }

    /// Fixed output file name; not derived from the input name.
    pub fn file_name(self) -> &'static str {
        match self {
            OutputFormat::Json => "output.json",
            OutputFormat::Markdown => "output.md",
        }
    }

    /// Format implied by a path's suffix: `.json` is JSON, anything else is
    /// Markdown.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Markdown,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(ConfigError::UnsupportedOutputFormat {
                value: s.to_string(),
            }),
        }
    }
}

/// Language-model service the engine may call to refine its output.
///
/// Selected explicitly rather than by a service-locator string; the locator
/// the engine needs is derived in [`AssistanceService::write_options`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssistanceService {
    /// Engine runs without assistance. (default)
    #[default]
    Disabled,
    /// A local or remote Ollama server.
    Ollama { base_url: String, model: String },
}

impl AssistanceService {
    /// Ollama on localhost with the default model.
    pub fn ollama_default() -> Self {
        AssistanceService::Ollama {
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, AssistanceService::Disabled)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let AssistanceService::Ollama { base_url, model } = self {
            let missing = |setting: &str| ConfigError::MissingServiceSetting {
                service: "ollama".into(),
                setting: setting.into(),
            };
            if base_url.trim().is_empty() {
                return Err(missing("base_url"));
            }
            if model.trim().is_empty() {
                return Err(missing("model"));
            }
        }
        Ok(())
    }

    fn write_options(&self, options: &mut Map<String, Value>) {
        match self {
            AssistanceService::Disabled => {}
            AssistanceService::Ollama { base_url, model } => {
                options.insert("use_llm".into(), Value::Bool(true));
                options.insert("llm_service".into(), Value::from(OLLAMA_SERVICE_LOCATOR));
                options.insert("ollama_base_url".into(), Value::from(base_url.as_str()));
                options.insert("ollama_model".into(), Value::from(model.as_str()));
            }
        }
    }
}
