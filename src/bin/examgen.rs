//! CLI binary for edgequake-examgen.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig`, shows a spinner while the endpoint works, and prints
//! or exports the resulting table.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_examgen::{
    export_csv, extract_text, generate_from_document, generate_from_text, render_table, to_csv_string,
    GenerationConfig, GenerationOutput, QuestionType, SourceDocument, TransportErrorPolicy,
    DEFAULT_EXPORT_FILENAME,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Characters of extracted notes shown by `--preview`.
const PREVIEW_CHARS: usize = 2000;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Multiple-choice questions as a table
  examgen notes.pdf

  # Short-answer questions, exported to questions.csv
  examgen --type short --export lecture.txt

  # Export to a chosen file
  examgen notes.pdf -o week3.csv

  # JSON on stdout
  examgen --format json notes.txt > questions.json

  # Check what will be sent (no API call)
  examgen --extract-only notes.pdf

  # Always get a table, even if the service is down
  examgen --on-error fallback notes.txt

ENVIRONMENT VARIABLES:
  HF_API_TOKEN      Bearer token for the inference endpoint
  HF_MODEL          Model id (default: tiiuae/falcon-7b-instruct)
  HF_ENDPOINT       Endpoint base URL (default: https://api-inference.huggingface.co)
  PDFIUM_LIB_PATH   Path to libpdfium for PDF extraction
"#;

/// Generate exam questions from class notes.
#[derive(Parser, Debug)]
#[command(
    name = "examgen",
    version,
    about = "Generate exam questions (MCQs or short answers) from text or PDF notes",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Notes file (.txt or .pdf).
    input: PathBuf,

    /// Question type: mcq or short.
    #[arg(short = 't', long = "type", env = "EXAMGEN_TYPE", value_enum, default_value = "mcq")]
    question_type: QuestionTypeArg,

    /// Inference model id.
    #[arg(long, env = "HF_MODEL", default_value = edgequake_examgen::config::DEFAULT_MODEL)]
    model: String,

    /// Inference endpoint base URL.
    #[arg(long, env = "HF_ENDPOINT", default_value = edgequake_examgen::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Bearer token for the endpoint.
    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "EXAMGEN_TEMPERATURE", default_value_t = 0.3)]
    temperature: f64,

    /// Maximum generated tokens.
    #[arg(long, env = "EXAMGEN_MAX_NEW_TOKENS", default_value_t = 256)]
    max_new_tokens: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "EXAMGEN_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Characters of the notes placed in the prompt.
    #[arg(long, env = "EXAMGEN_BUDGET", default_value_t = 1500)]
    budget: usize,

    /// Do not ask the endpoint to wait for a cold model.
    #[arg(long)]
    no_wait: bool,

    /// When the service is unreachable: abort, or show the error as a row.
    #[arg(long, env = "EXAMGEN_ON_ERROR", value_enum, default_value = "abort")]
    on_error: OnErrorArg,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "EXAMGEN_PASSWORD")]
    password: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Write the table as CSV to this file.
    #[arg(short, long, env = "EXAMGEN_OUTPUT")]
    output: Option<PathBuf>,

    /// Write the table as CSV to ./questions.csv.
    #[arg(long, conflicts_with = "output")]
    export: bool,

    /// Stdout format.
    #[arg(long, value_enum, default_value = "table")]
    format: FormatArg,

    /// Print the first 2000 characters of the extracted notes to stderr.
    #[arg(long)]
    preview: bool,

    /// Print the extracted notes and exit without calling the endpoint.
    #[arg(long)]
    extract_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EXAMGEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "EXAMGEN_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum QuestionTypeArg {
    Mcq,
    Short,
}

impl From<QuestionTypeArg> for QuestionType {
    fn from(v: QuestionTypeArg) -> Self {
        match v {
            QuestionTypeArg::Mcq => QuestionType::MultipleChoice,
            QuestionTypeArg::Short => QuestionType::ShortAnswer,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OnErrorArg {
    Abort,
    Fallback,
}

impl From<OnErrorArg> for TransportErrorPolicy {
    fn from(v: OnErrorArg) -> Self {
        match v {
            OnErrorArg::Abort => TransportErrorPolicy::Abort,
            OnErrorArg::Fallback => TransportErrorPolicy::Fallback,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Table,
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep INFO logs from
    // tearing it unless asked for.
    let show_spinner = !cli.quiet && !cli.extract_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_spinner {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let text = extract_text(&cli.input, &config)
            .await
            .context("Failed to extract notes")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        return Ok(());
    }

    let document = edgequake_examgen::pipeline::input::resolve_input(&cli.input)
        .await
        .context("Failed to read notes")?;

    let question_type: QuestionType = cli.question_type.into();

    // With --preview the notes are extracted here once and reused.
    let previewed = if cli.preview {
        Some(preview_notes(&document, &config).await?)
    } else {
        None
    };

    // ── Generate ─────────────────────────────────────────────────────────
    let spinner = show_spinner.then(|| start_spinner(question_type));

    let result = match previewed {
        Some(ref text) => generate_from_text(text, question_type, &config).await,
        None => generate_from_document(&document, question_type, &config).await,
    };
    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }
    let output = result.context("Question generation failed")?;

    if !cli.quiet {
        report(&output);
    }

    // ── Export ───────────────────────────────────────────────────────────
    let export_path = cli
        .output
        .clone()
        .or_else(|| cli.export.then(|| PathBuf::from(DEFAULT_EXPORT_FILENAME)));
    if let Some(ref path) = export_path {
        export_csv(&output.records, path)
            .with_context(|| format!("Failed to export CSV to {}", path.display()))?;
        if !cli.quiet {
            eprintln!("{}  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    // ── Display ──────────────────────────────────────────────────────────
    let rendered = match cli.format {
        FormatArg::Table => render_table(&output.records),
        FormatArg::Csv => to_csv_string(&output.records).context("Failed to render CSV")?,
        FormatArg::Json => {
            let mut json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            json.push('\n');
            json
        }
    };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(rendered.as_bytes())
        .context("Failed to write to stdout")?;

    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .endpoint(&cli.endpoint)
        .model(&cli.model)
        .temperature(cli.temperature)
        .max_new_tokens(cli.max_new_tokens)
        .timeout_secs(cli.timeout)
        .source_char_budget(cli.budget)
        .wait_for_model(!cli.no_wait)
        .on_transport_error(cli.on_error.into());

    if let Some(ref token) = cli.token {
        builder = builder.api_token(token);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }

    builder.build().context("Invalid configuration")
}

/// Extract the notes and print the first [`PREVIEW_CHARS`] to stderr.
async fn preview_notes(document: &SourceDocument, config: &GenerationConfig) -> Result<String> {
    let text = edgequake_examgen::pipeline::extract::extract(document, config)
        .await
        .context("Failed to extract notes")?;
    let preview = edgequake_examgen::prompts::truncate_chars(&text, PREVIEW_CHARS);
    eprintln!("{}", bold("Preview of uploaded notes"));
    eprintln!("{}", dim(preview));
    eprintln!();
    Ok(text)
}

fn start_spinner(question_type: QuestionType) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(format!("Generating {}…", question_type.label()));
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn report(output: &GenerationOutput) {
    let s = &output.stats;
    if s.service_unavailable {
        eprintln!(
            "{} generation service unavailable; showing the error as a raw record",
            cyan("⚠")
        );
    } else if s.fallback {
        eprintln!(
            "{} model output was not a JSON list; showing raw text",
            cyan("⚠")
        );
    } else {
        eprintln!(
            "{} {} {} generated",
            green("✔"),
            bold(&output.records.len().to_string()),
            output.question_type.label()
        );
    }
    let truncated = if s.truncated { "  (notes truncated)" } else { "" };
    eprintln!(
        "   {}",
        dim(&format!(
            "{}  ·  {} → {} prompt chars{}  ·  {}ms",
            s.model, s.source_chars, s.prompt_chars, truncated, s.total_duration_ms
        ))
    );
}
