//! CLI binary for pdf2struct.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, runs one conversion, and prints status banners.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2struct::config::{DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL, DEFAULT_OUTPUT_DIR};
use pdf2struct::engine::DEFAULT_MARKER_PROGRAM;
use pdf2struct::{save, AssistanceService, ConversionConfig, Converter, EngineKind};
use serde_json::Value;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Block tree as JSON (default) into ./output/output.json
  pdf2struct data.pdf

  # Markdown into ./build/output.md
  pdf2struct data.pdf --output-format markdown --output-dir build

  # First page only, refined by a local Ollama model
  pdf2struct data.pdf --page-range 0 --use-llm --ollama-model llama3.1:8b

  # Pass any other engine option through untouched
  pdf2struct data.pdf --set disable_image_extraction=true --set workers=2

  # Run marker from a specific virtualenv
  pdf2struct data.pdf --engine-command ~/.venvs/marker/bin/marker_single

OUTPUT:
  json      <output-dir>/output.json  block tree; polygon/bbox removed at every
                                      depth, metadata/block_type at the root
  markdown  <output-dir>/output.md    rendered Markdown, written verbatim

ENVIRONMENT VARIABLES:
  PDF2STRUCT_OUTPUT_FORMAT   Default for --output-format
  PDF2STRUCT_OUTPUT_DIR      Default for --output-dir
  PDF2STRUCT_ENGINE          Default for --engine-command
  RUST_LOG                   Override log filter (e.g. pdf2struct=debug)
"#;

/// Convert a document to a sanitised JSON block tree or Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2struct",
    version,
    about = "Convert a document to a sanitised JSON block tree or Markdown",
    long_about = "Convert a document to a sanitised JSON block tree or Markdown using the \
marker layout engine. The engine runs once; layout geometry and renderer bookkeeping are \
stripped before the result is written to <output-dir>/output.json or output.md.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// The document to convert.
    input_file: PathBuf,

    /// Output format: json or markdown.
    #[arg(long, env = "PDF2STRUCT_OUTPUT_FORMAT", default_value = "json")]
    output_format: String,

    /// Directory the output file is written into (created if absent).
    #[arg(long, env = "PDF2STRUCT_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Engine page range, 0-indexed: 0, 0-4, or 0,5-10,20.
    #[arg(long, env = "PDF2STRUCT_PAGE_RANGE")]
    page_range: Option<String>,

    /// Let the engine refine its output with an Ollama model.
    #[arg(long, env = "PDF2STRUCT_USE_LLM")]
    use_llm: bool,

    /// Ollama endpoint used with --use-llm.
    #[arg(long, env = "PDF2STRUCT_OLLAMA_BASE_URL", default_value = DEFAULT_OLLAMA_BASE_URL)]
    ollama_base_url: String,

    /// Ollama model used with --use-llm.
    #[arg(long, env = "PDF2STRUCT_OLLAMA_MODEL", default_value = DEFAULT_OLLAMA_MODEL)]
    ollama_model: String,

    /// Extra engine option; VALUE is parsed as JSON, else kept as a string.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    set: Vec<(String, Value)>,

    /// Engine executable.
    #[arg(long, env = "PDF2STRUCT_ENGINE", default_value = DEFAULT_MARKER_PROGRAM)]
    engine_command: PathBuf,

    /// Argument placed before the input path when running the engine.
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2STRUCT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2STRUCT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2STRUCT_QUIET")]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let (show_progress, filter) = output_mode(&cli);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let outcome = match build_config(&cli) {
        Ok(config) => {
            if !cli.quiet {
                println!(
                    "\nConverting {} to {} format...",
                    bold(&cli.input_file.display().to_string()),
                    config.output_format
                );
                println!("Output will be saved to {}\n", config.output_dir.display());
            }
            run(&cli, &config, show_progress).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(path) => {
            if !cli.quiet {
                println!("\nOutput saved to {}", dim(&path.display().to_string()));
                println!("\n{}", green("Conversion successful ✔"));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("\n{}", red("Conversion failed ❌"));
            Err(e)
        }
    }
}

/// Whether to show the spinner, and the default log filter.
///
/// The spinner covers the long engine call and any log line would tear it,
/// so it only runs when logging is limited to errors.
fn output_mode(cli: &Cli) -> (bool, &'static str) {
    let show_progress = !cli.quiet && !cli.no_progress && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    (show_progress, filter)
}

/// Create the output directory, run the engine once, and save the result.
async fn run(cli: &Cli, config: &ConversionConfig, show_progress: bool) -> Result<PathBuf> {
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let converter = Converter::from_kind(EngineKind::Marker {
        program: cli.engine_command.clone(),
        args: cli.engine_args.clone(),
    });

    let spinner = show_progress.then(|| engine_spinner(converter.engine_name()));
    let result = converter.convert(config).await;
    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }
    let result = result.context("Conversion failed")?;

    let path = config.output_path();
    if !save(&result, &path) {
        anyhow::bail!("Could not write {}", path.display());
    }
    Ok(path)
}

fn engine_spinner(engine: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Converting");
    bar.set_message(format!("running {engine}…"));
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder(&cli.input_file, &cli.output_dir)
        .output_format(cli.output_format.as_str());

    if let Some(ref range) = cli.page_range {
        builder = builder.page_range(range.as_str());
    }
    if cli.use_llm {
        builder = builder.assistance(AssistanceService::Ollama {
            base_url: cli.ollama_base_url.clone(),
            model: cli.ollama_model.clone(),
        });
    }
    for (key, value) in &cli.set {
        builder = builder.set(key.as_str(), value.clone());
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--set KEY=VALUE`; VALUE is JSON if it parses, otherwise a string.
fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
