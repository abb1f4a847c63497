//! Generation endpoint interaction: one POST, decoded at the boundary.
//!
//! The endpoint is loosely specified. A well-behaved text-generation model
//! answers `[{"generated_text": "..."}]`, but error pages, queue messages and
//! other JSON shapes come back too. The body is therefore decoded
//! defensively into [`GenerationResponse`] right here, and everything
//! downstream works on plain text.
//!
//! No retry loop: one prompt, one request.

use crate::config::GenerationConfig;
use crate::error::ExamGenError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Decoded response of the generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResponse {
    /// The body was a list whose first element carried `generated_text`.
    StructuredGeneration(String),
    /// Anything else, stringified.
    OpaqueBody(String),
}

impl GenerationResponse {
    /// Decode a raw response body.
    ///
    /// * `[{"generated_text": s}, ...]` → `StructuredGeneration(s)`
    /// * a bare JSON string → `OpaqueBody` of its contents (unquoted)
    /// * any other JSON → `OpaqueBody` of its compact serialisation
    /// * non-JSON → `OpaqueBody` of the body as received
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(_) => GenerationResponse::OpaqueBody(body.to_string()),
        }
    }

    /// Decode an already-parsed JSON body.
    pub fn from_value(value: Value) -> Self {
        if let Some(text) = value
            .as_array()
            .and_then(|items| items.first())
            .and_then(|first| first.get("generated_text"))
            .and_then(Value::as_str)
        {
            return GenerationResponse::StructuredGeneration(text.to_string());
        }
        match value {
            Value::String(s) => GenerationResponse::OpaqueBody(s),
            other => GenerationResponse::OpaqueBody(other.to_string()),
        }
    }

    /// The text to parse, whichever variant this is.
    pub fn text(&self) -> &str {
        match self {
            GenerationResponse::StructuredGeneration(s) | GenerationResponse::OpaqueBody(s) => s,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, GenerationResponse::StructuredGeneration(_))
    }
}

/// Something that turns a prompt into generated text.
///
/// The HTTP implementation is [`InferenceClient`]; tests and embedders can
/// supply their own via [`crate::config::GenerationConfigBuilder::backend`].
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Send `prompt` and return the decoded response.
    ///
    /// Implementations return `Err` only for transport-level failures
    /// (timeout, non-success status, connection errors).
    async fn generate(&self, prompt: &str) -> Result<GenerationResponse, ExamGenError>;

    /// Short identifier for logs and stats.
    fn name(&self) -> String {
        "custom".to_string()
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: usize,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

// ── HTTP backend ─────────────────────────────────────────────────────────

/// Hosted inference endpoint reached over HTTP.
#[derive(Clone)]
pub struct InferenceClient {
    client: reqwest::Client,
    url: String,
    model: String,
    api_token: Option<String>,
    max_new_tokens: usize,
    temperature: f64,
    wait_for_model: bool,
    timeout_secs: u64,
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("url", &self.url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("max_new_tokens", &self.max_new_tokens)
            .field("temperature", &self.temperature)
            .field("wait_for_model", &self.wait_for_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl InferenceClient {
    /// Build a client from the endpoint-related fields of `config`.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, ExamGenError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExamGenError::Internal(format!("HTTP client: {}", e)))?;

        if config.api_token.is_none() {
            warn!("No API token configured; sending requests without Authorization header");
        }

        Ok(Self {
            client,
            url: config.model_url(),
            model: config.model.clone(),
            api_token: config.api_token.clone(),
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            wait_for_model: config.wait_for_model,
            timeout_secs: config.timeout_secs,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> ExamGenError {
        if e.is_timeout() {
            ExamGenError::RequestTimeout {
                url: self.url.clone(),
                secs: self.timeout_secs,
            }
        } else {
            ExamGenError::Transport {
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl GenerationBackend for InferenceClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResponse, ExamGenError> {
        let start = Instant::now();
        let body = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: self.max_new_tokens,
                temperature: self.temperature,
            },
            options: InferenceOptions {
                wait_for_model: self.wait_for_model,
            },
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(ExamGenError::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
                body: text,
            });
        }

        let decoded = GenerationResponse::from_body(&text);
        debug!(
            "{}: {} bytes in {:?} (structured: {})",
            self.model,
            text.len(),
            start.elapsed(),
            decoded.is_structured()
        );
        Ok(decoded)
    }

    fn name(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_generation_first_element() {
        let r = GenerationResponse::from_body(
            r#"[{"generated_text": "[1,2]"}, {"generated_text": "ignored"}]"#,
        );
        assert_eq!(r, GenerationResponse::StructuredGeneration("[1,2]".into()));
    }

    #[test]
    fn error_object_is_stringified() {
        let r = GenerationResponse::from_body(r#"{"error":"Model is overloaded"}"#);
        assert_eq!(
            r,
            GenerationResponse::OpaqueBody(r#"{"error":"Model is overloaded"}"#.into())
        );
    }

    #[test]
    fn non_json_body_kept_verbatim() {
        let r = GenerationResponse::from_body("ERROR 503");
        assert_eq!(r, GenerationResponse::OpaqueBody("ERROR 503".into()));
    }

    #[test]
    fn json_string_body_is_unquoted() {
        let r = GenerationResponse::from_body(r#""not json""#);
        assert_eq!(r.text(), "not json");
    }

    #[test]
    fn empty_list_and_non_string_field_are_opaque() {
        assert!(!GenerationResponse::from_body("[]").is_structured());
        assert!(!GenerationResponse::from_value(json!([{"generated_text": 3}])).is_structured());
        assert!(!GenerationResponse::from_value(json!(["plain"])).is_structured());
    }

    #[test]
    fn request_body_shape() {
        let body = InferenceRequest {
            inputs: "prompt",
            parameters: InferenceParameters {
                max_new_tokens: 256,
                temperature: 0.3,
            },
            options: InferenceOptions {
                wait_for_model: true,
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "inputs": "prompt",
                "parameters": {"max_new_tokens": 256, "temperature": 0.3},
                "options": {"wait_for_model": true}
            })
        );
    }
}
