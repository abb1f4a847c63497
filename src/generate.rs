//! Generation entry points.
//!
//! [`QuestionGenerator`] is the prompt-and-parse core: text in, records out.
//! The free functions wrap it with input resolution and extraction for the
//! common "file on disk" case, mirroring how the CLI uses the library.

use crate::config::{GenerationConfig, QuestionType, TransportErrorPolicy};
use crate::error::ExamGenError;
use crate::export;
use crate::output::{GeneratedRecord, GenerationOutput, GenerationStats};
use crate::pipeline::extract;
use crate::pipeline::inference::{GenerationBackend, InferenceClient};
use crate::pipeline::input::{self, SourceDocument};
use crate::pipeline::parse;
use crate::prompts;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns notes text into exam-question records with one backend call.
///
/// Holds no per-call state; one instance can serve any number of
/// sequential calls.
#[derive(Clone)]
pub struct QuestionGenerator {
    config: GenerationConfig,
    backend: Arc<dyn GenerationBackend>,
}

impl std::fmt::Debug for QuestionGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionGenerator")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl QuestionGenerator {
    /// Create a generator, using `config.backend` if set and otherwise an
    /// HTTP [`InferenceClient`] for `config.endpoint` / `config.model`.
    pub fn new(config: GenerationConfig) -> Result<Self, ExamGenError> {
        let backend = match config.backend {
            Some(ref backend) => Arc::clone(backend),
            None => Arc::new(InferenceClient::from_config(&config)?) as Arc<dyn GenerationBackend>,
        };
        Ok(Self { config, backend })
    }

    /// Generate records for `text`.
    ///
    /// The result is never empty: unusable generated text degrades to a
    /// single `{raw}` record. Transport failures are returned as errors
    /// unless the config's policy is [`TransportErrorPolicy::Fallback`].
    pub async fn generate(
        &self,
        text: &str,
        question_type: QuestionType,
    ) -> Result<Vec<GeneratedRecord>, ExamGenError> {
        self.generate_with_stats(text, question_type)
            .await
            .map(|(records, _)| records)
    }

    /// [`Self::generate`] plus size/timing stats (extraction time unset).
    pub async fn generate_with_stats(
        &self,
        text: &str,
        question_type: QuestionType,
    ) -> Result<(Vec<GeneratedRecord>, GenerationStats), ExamGenError> {
        let start = Instant::now();
        let budget = self.config.source_char_budget;
        let source_chars = text.chars().count();
        let truncated = source_chars > budget;
        if truncated {
            debug!("Notes truncated from {} to {} chars", source_chars, budget);
        }

        let prompt = prompts::build_prompt(text, question_type, budget);
        info!(
            "Requesting {} from {} ({} prompt chars)",
            question_type.label(),
            self.backend.name(),
            prompt.chars().count()
        );

        let mut service_unavailable = false;
        let records = match self.backend.generate(&prompt).await {
            Ok(response) => {
                let records = parse::parse_records(response.text());
                parse::check_shape(&records, question_type);
                records
            }
            Err(e) if e.is_service_unavailable()
                && self.config.on_transport_error == TransportErrorPolicy::Fallback =>
            {
                warn!("{}; returning fallback record", e);
                service_unavailable = true;
                vec![GeneratedRecord::fallback(e.to_string())]
            }
            Err(e) => return Err(e),
        };

        let elapsed = start.elapsed().as_millis() as u64;
        let stats = GenerationStats {
            model: self.backend.name(),
            source_chars,
            prompt_chars: prompt.chars().count(),
            truncated,
            fallback: records.len() == 1 && records[0].is_fallback(),
            service_unavailable,
            extraction_duration_ms: 0,
            generation_duration_ms: elapsed,
            total_duration_ms: elapsed,
        };
        info!("Generated {} records in {}ms", records.len(), elapsed);
        Ok((records, stats))
    }
}

/// Generate questions from a notes file (`.txt` or `.pdf`).
///
/// # Errors
/// Returns `Err` for unreadable files, undecodable PDFs, and (under the
/// default policy) an unreachable generation endpoint. Unparseable model
/// output is *not* an error.
pub async fn generate_questions(
    path: impl AsRef<Path>,
    question_type: QuestionType,
    config: &GenerationConfig,
) -> Result<GenerationOutput, ExamGenError> {
    let path = path.as_ref();
    info!("Starting generation: {}", path.display());
    let document = input::resolve_input(path).await?;
    generate_from_document(&document, question_type, config).await
}

/// Generate questions from an in-memory document.
pub async fn generate_from_document(
    document: &SourceDocument,
    question_type: QuestionType,
    config: &GenerationConfig,
) -> Result<GenerationOutput, ExamGenError> {
    let total_start = Instant::now();

    // Build the generator first so config problems surface before extraction work.
    let generator = QuestionGenerator::new(config.clone())?;

    let extraction_start = Instant::now();
    let text = extract::extract(document, config).await?;
    let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} chars from {:?} in {}ms",
        text.chars().count(),
        document.kind,
        extraction_duration_ms
    );

    let (records, mut stats) = generator.generate_with_stats(&text, question_type).await?;
    stats.extraction_duration_ms = extraction_duration_ms;
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    Ok(GenerationOutput {
        question_type,
        records,
        stats,
    })
}

/// Generate questions from uploaded bytes.
///
/// `content_type` is the declared MIME type, if any; without it the kind is
/// sniffed from the bytes.
pub async fn generate_from_bytes(
    bytes: impl Into<Vec<u8>>,
    content_type: Option<&str>,
    question_type: QuestionType,
    config: &GenerationConfig,
) -> Result<GenerationOutput, ExamGenError> {
    let document = SourceDocument::from_upload(bytes, content_type);
    generate_from_document(&document, question_type, config).await
}

/// Generate questions from already-extracted text.
pub async fn generate_from_text(
    text: &str,
    question_type: QuestionType,
    config: &GenerationConfig,
) -> Result<GenerationOutput, ExamGenError> {
    let generator = QuestionGenerator::new(config.clone())?;
    let (records, stats) = generator.generate_with_stats(text, question_type).await?;
    Ok(GenerationOutput {
        question_type,
        records,
        stats,
    })
}

/// Generate questions and export them as CSV to `output_path`.
pub async fn generate_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    question_type: QuestionType,
    config: &GenerationConfig,
) -> Result<GenerationStats, ExamGenError> {
    let output = generate_questions(path, question_type, config).await?;
    let output_path = output_path.as_ref().to_path_buf();
    let records = output.records;

    tokio::task::spawn_blocking(move || export::export_csv(&records, &output_path))
        .await
        .map_err(|e| ExamGenError::Internal(format!("Export task panicked: {}", e)))??;

    Ok(output.stats)
}

/// Synchronous wrapper around [`generate_questions`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    path: impl AsRef<Path>,
    question_type: QuestionType,
    config: &GenerationConfig,
) -> Result<GenerationOutput, ExamGenError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExamGenError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_questions(path, question_type, config))
}

/// Extract the text of a notes file without calling the generation endpoint.
///
/// Does not require an API token.
pub async fn extract_text(
    path: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<String, ExamGenError> {
    let document = input::resolve_input(path).await?;
    extract::extract(&document, config).await
}
