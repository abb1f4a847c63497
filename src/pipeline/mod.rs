//! Pipeline stages for notes-to-questions generation.
//!
//! Each submodule implements one transformation step, independently
//! testable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ (prompts) ──▶ inference ──▶ parse
//! (path)    (utf-8/pdfium)            (HTTP POST)   (records)
//! ```
//!
//! 1. [`input`]     — read the user-supplied file and classify it
//! 2. [`extract`]   — decode plain text or pull per-page text out of a PDF;
//!    pdfium runs in `spawn_blocking`
//! 3. [`inference`] — the only stage with network I/O: one request to the
//!    generation endpoint, decoded at the boundary
//! 4. [`parse`]     — JSON-decode the generated text, falling back to a
//!    single `{raw}` record

pub mod extract;
pub mod inference;
pub mod input;
pub mod parse;
