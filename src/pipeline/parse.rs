//! Record parsing: generated text → non-empty list of [`GeneratedRecord`].
//!
//! The generator is an unreliable text source, so parsing never fails. If
//! the text is not a usable JSON list, the whole text becomes a single
//! `{raw}` record and the caller still has one row to show.

use crate::config::QuestionType;
use crate::output::GeneratedRecord;
use serde_json::Value;
use tracing::{debug, warn};

/// Decode `text` into records.
///
/// | Decoded value        | Result                              |
/// |----------------------|-------------------------------------|
/// | non-empty array      | one `Item` per element, verbatim    |
/// | object               | a single `Item`                     |
/// | empty array, scalar  | `[Fallback { raw: text }]`          |
/// | not JSON             | `[Fallback { raw: text }]`          |
///
/// Leading/trailing whitespace is ignored when decoding; the fallback keeps
/// `text` exactly as given.
pub fn parse_records(text: &str) -> Vec<GeneratedRecord> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Array(items)) if !items.is_empty() => {
            items.into_iter().map(GeneratedRecord::Item).collect()
        }
        Ok(object @ Value::Object(_)) => vec![GeneratedRecord::Item(object)],
        Ok(other) => {
            warn!("Generated JSON is not a list of records ({}); using raw text", kind_of(&other));
            vec![GeneratedRecord::fallback(text)]
        }
        Err(e) => {
            warn!("Generated text is not valid JSON ({}); using raw text", e);
            vec![GeneratedRecord::fallback(text)]
        }
    }
}

/// Log (but never reject) items that do not match the requested shape.
pub fn check_shape(records: &[GeneratedRecord], question_type: QuestionType) {
    let fields = question_type.expected_fields();
    let mismatched = records
        .iter()
        .filter(|r| !r.is_fallback() && !r.has_fields(fields))
        .count();
    if mismatched > 0 {
        debug!(
            "{}/{} items lack some of {:?}; passing through unchanged",
            mismatched,
            records.len(),
            fields
        );
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "empty array",
        Value::Object(_) => "object",
    }
}
