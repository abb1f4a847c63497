//! # edgequake-examgen
//!
//! Generate exam questions from class notes using a hosted text-generation
//! endpoint.
//!
//! Upload notes as plain text or PDF, pick a question type, and get back a
//! table of records ready for display or CSV export:
//!
//! * **Multiple choice**: `{question, options: {A..D}, answer, explanation}`
//! * **Short answer**: `{question, model_answer, rubric}`
//!
//! ## Pipeline Overview
//!
//! ```text
//! notes (.txt / .pdf)
//!  │
//!  ├─ 1. Input    read the file, classify plain text vs PDF
//!  ├─ 2. Extract  UTF-8 decode (lossy) or per-page pdfium text
//!  ├─ 3. Prompt   first 1500 chars spliced into a fixed template
//!  ├─ 4. Generate one POST to <endpoint>/models/<model>
//!  ├─ 5. Parse    JSON list → records; anything else → [{raw}]
//!  └─ 6. Output   records + stats, table / CSV export
//! ```
//!
//! The parse step never fails: if the model answers with something that is
//! not a JSON list, the whole answer becomes one `{"raw": ...}` record, so
//! there is always at least one row to show.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_examgen::{generate_questions, GenerationConfig, QuestionType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // HF_API_TOKEN / HF_MODEL / HF_ENDPOINT are read from the environment
//!     let config = GenerationConfig::from_env()?;
//!     let output = generate_questions("notes.pdf", QuestionType::MultipleChoice, &config).await?;
//!     for record in &output.records {
//!         println!("{}", serde_json::to_string(record)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `examgen` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! PDF extraction needs the pdfium shared library at runtime; set
//! `PDFIUM_LIB_PATH` if it is not installed system-wide.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, QuestionType, TransportErrorPolicy};
pub use error::ExamGenError;
pub use export::{export_csv, render_table, to_csv_string, DEFAULT_EXPORT_FILENAME};
pub use generate::{
    extract_text, generate_from_bytes, generate_from_document, generate_from_text, generate_questions, generate_sync,
    generate_to_file, QuestionGenerator,
};
pub use output::{GeneratedRecord, GenerationOutput, GenerationStats};
pub use pipeline::inference::{GenerationBackend, GenerationResponse, InferenceClient};
pub use pipeline::input::{DocumentKind, SourceDocument};
