//! Output types returned by the generation entry points.

use crate::config::QuestionType;
use serde::Serialize;
use serde_json::Value;

/// One row of the result table.
///
/// Serialises untagged: an `Item` becomes exactly the JSON the model
/// produced, a `Fallback` becomes `{"raw": "<text>"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeneratedRecord {
    /// The generated text could not be used as records; carries it whole.
    Fallback { raw: String },
    /// One element of the generated JSON, passed through unchecked.
    Item(Value),
}

impl GeneratedRecord {
    pub fn fallback(raw: impl Into<String>) -> Self {
        GeneratedRecord::Fallback { raw: raw.into() }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, GeneratedRecord::Fallback { .. })
    }

    /// Top-level field of an object item; `raw` for fallback records.
    pub fn get(&self, field: &str) -> Option<Value> {
        match self {
            GeneratedRecord::Fallback { raw } if field == "raw" => Some(Value::String(raw.clone())),
            GeneratedRecord::Fallback { .. } => None,
            GeneratedRecord::Item(value) => value.get(field).cloned(),
        }
    }

    /// True when this is an object item carrying every field in `fields`.
    pub fn has_fields(&self, fields: &[&str]) -> bool {
        match self {
            GeneratedRecord::Item(Value::Object(map)) => fields.iter().all(|f| map.contains_key(*f)),
            _ => false,
        }
    }
}

/// Timing and size details of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationStats {
    /// Identifier of the backend that served the request.
    pub model: String,
    /// Characters in the extracted notes.
    pub source_chars: usize,
    /// Characters in the prompt actually sent.
    pub prompt_chars: usize,
    /// Whether the notes exceeded the character budget.
    pub truncated: bool,
    /// Whether the result is a single fallback record.
    pub fallback: bool,
    /// Set when the fallback record carries a transport error rather than
    /// model output.
    pub service_unavailable: bool,
    pub extraction_duration_ms: u64,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a full notes-to-questions run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutput {
    pub question_type: QuestionType,
    /// Never empty.
    pub records: Vec<GeneratedRecord>,
    pub stats: GenerationStats,
}
