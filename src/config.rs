//! Configuration types for question generation.
//!
//! Every knob lives in [`GenerationConfig`], built via its
//! [`GenerationConfigBuilder`]. The configuration is passed explicitly into
//! the generator, so tests can point it at a mock endpoint (or hand it a
//! pre-built backend) without touching process environment variables.

use crate::error::ExamGenError;
use crate::pipeline::inference::GenerationBackend;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default inference endpoint base URL.
pub const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "tiiuae/falcon-7b-instruct";

/// Configuration for one question-generation run.
///
/// # Example
/// ```rust
/// use edgequake_examgen::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .model("gpt2")
///     .api_token("hf_xxx")
///     .timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_new_tokens, 256);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Base URL of the inference service. Requests go to
    /// `<endpoint>/models/<model>`. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Model identifier appended to the endpoint path. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Bearer token. When `None` the request is sent without an
    /// `Authorization` header (public endpoints, local servers).
    pub api_token: Option<String>,

    /// Sampling temperature. Default: 0.3.
    ///
    /// Stored as `f64` so the value on the wire is exactly `0.3`.
    pub temperature: f64,

    /// Generation-length cap sent as `max_new_tokens`. Default: 256.
    pub max_new_tokens: usize,

    /// Ask the endpoint to block while a cold model loads instead of
    /// answering 503 immediately. Default: true.
    pub wait_for_model: bool,

    /// Request timeout in seconds. Default: 60.
    pub timeout_secs: u64,

    /// Number of leading characters of the notes that go into the prompt.
    /// Default: 1500. Truncation is silent.
    pub source_char_budget: usize,

    /// What to do when the endpoint cannot be reached. Default: [`TransportErrorPolicy::Abort`].
    pub on_transport_error: TransportErrorPolicy,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit path to the pdfium shared library. If `None`, the system
    /// library is used.
    pub pdfium_library: Option<PathBuf>,

    /// Pre-constructed generation backend. Takes precedence over
    /// `endpoint`/`model`/`api_token`.
    pub backend: Option<Arc<dyn GenerationBackend>>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_token: None,
            temperature: 0.3,
            max_new_tokens: 256,
            wait_for_model: true,
            timeout_secs: 60,
            source_char_budget: 1500,
            on_transport_error: TransportErrorPolicy::default(),
            password: None,
            pdfium_library: None,
            backend: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_new_tokens", &self.max_new_tokens)
            .field("wait_for_model", &self.wait_for_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("source_char_budget", &self.source_char_budget)
            .field("on_transport_error", &self.on_transport_error)
            .field("pdfium_library", &self.pdfium_library)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn GenerationBackend>"))
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults overlaid with `HF_API_TOKEN`, `HF_MODEL`, `HF_ENDPOINT` and
    /// `PDFIUM_LIB_PATH` when set and non-empty.
    pub fn from_env() -> Result<Self, ExamGenError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let mut builder = Self::builder();
        if let Some(token) = var("HF_API_TOKEN") {
            builder = builder.api_token(token);
        }
        if let Some(model) = var("HF_MODEL") {
            builder = builder.model(model);
        }
        if let Some(endpoint) = var("HF_ENDPOINT") {
            builder = builder.endpoint(endpoint);
        }
        if let Some(lib) = var("PDFIUM_LIB_PATH") {
            builder = builder.pdfium_library(lib);
        }
        builder.build()
    }

    /// Full request URL: `<endpoint>/models/<model>`.
    pub fn model_url(&self) -> String {
        format!(
            "{}/models/{}",
            self.endpoint.trim_end_matches('/'),
            self.model.trim_start_matches('/')
        )
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = Some(token.into());
        self
    }

    pub fn temperature(mut self, t: f64) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_new_tokens(mut self, n: usize) -> Self {
        self.config.max_new_tokens = n;
        self
    }

    pub fn wait_for_model(mut self, v: bool) -> Self {
        self.config.wait_for_model = v;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn source_char_budget(mut self, chars: usize) -> Self {
        self.config.source_char_budget = chars;
        self
    }

    pub fn on_transport_error(mut self, policy: TransportErrorPolicy) -> Self {
        self.config.on_transport_error = policy;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, ExamGenError> {
        let c = &self.config;
        if c.backend.is_none() {
            if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
                return Err(ExamGenError::InvalidConfig(format!(
                    "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                    c.endpoint
                )));
            }
            if c.model.trim().is_empty() {
                return Err(ExamGenError::InvalidConfig("Model id must not be empty".into()));
            }
        }
        if c.max_new_tokens == 0 {
            return Err(ExamGenError::InvalidConfig(
                "max_new_tokens must be ≥ 1".into(),
            ));
        }
        if c.timeout_secs == 0 {
            return Err(ExamGenError::InvalidConfig("Timeout must be ≥ 1s".into()));
        }
        if c.source_char_budget == 0 {
            return Err(ExamGenError::InvalidConfig(
                "Source character budget must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Kind of exam item to ask the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Four-option multiple-choice questions with answer and explanation. (default)
    #[default]
    MultipleChoice,
    /// Open questions with a model answer and a scoring rubric.
    ShortAnswer,
}

impl QuestionType {
    /// Field names of one well-formed item of this type.
    pub fn expected_fields(self) -> &'static [&'static str] {
        match self {
            QuestionType::MultipleChoice => &["question", "options", "answer", "explanation"],
            QuestionType::ShortAnswer => &["question", "model_answer", "rubric"],
        }
    }

    /// Human-readable label used in logs and the CLI.
    pub fn label(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "MCQs",
            QuestionType::ShortAnswer => "Short Answers",
        }
    }
}

/// Behaviour when the generation endpoint times out, answers with a
/// non-success status, or cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorPolicy {
    /// Return the error to the caller. (default)
    #[default]
    Abort,
    /// Replace the result with a single fallback record holding the error
    /// message, so the caller always gets something to display.
    Fallback,
}
