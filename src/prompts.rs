//! Prompt templates for exam-question generation.
//!
//! Both templates ask for exactly three items as a JSON array. The passage is
//! spliced in at the `{passage}` placeholder after truncation to the
//! configured character budget.

use crate::config::QuestionType;

/// Placeholder replaced by the (truncated) notes text.
pub const PASSAGE_PLACEHOLDER: &str = "{passage}";

/// Template for multiple-choice questions.
pub const MULTIPLE_CHOICE_TEMPLATE: &str = r#"You are an exam writer. From the passage below, generate 3 MCQs in JSON format.
Passage: <<< {passage} >>>
Format:
[
  {
    "question": "...",
    "options": {"A":"...","B":"...","C":"...","D":"..."},
    "answer": "...",
    "explanation": "..."
  }
]"#;

/// Template for short-answer questions.
pub const SHORT_ANSWER_TEMPLATE: &str = r#"You are an exam writer. From the passage below, generate 3 short-answer questions in JSON format.
Passage: <<< {passage} >>>
Format:
[
  {
    "question": "...",
    "model_answer": "...",
    "rubric": "0/1/2 scoring"
  }
]"#;

/// The fixed template for a question type.
pub fn template_for(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::MultipleChoice => MULTIPLE_CHOICE_TEMPLATE,
        QuestionType::ShortAnswer => SHORT_ANSWER_TEMPLATE,
    }
}

/// Return the first `max_chars` characters of `text` (by `char`, not byte
/// or token). Borrowed; never splits a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the full prompt for `question_type` from `text`.
///
/// Only the first `char_budget` characters of `text` are used.
pub fn build_prompt(text: &str, question_type: QuestionType, char_budget: usize) -> String {
    let passage = truncate_chars(text, char_budget);
    // replacen on the template: passage content is never rescanned.
    template_for(question_type).replacen(PASSAGE_PLACEHOLDER, passage, 1)
}
