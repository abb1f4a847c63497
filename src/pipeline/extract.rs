//! Text extraction: turn a [`SourceDocument`] into one plain-text string.
//!
//! ## Plain text
//!
//! Bytes are decoded as UTF-8 and invalid sequences are dropped, so this
//! path never fails.
//!
//! ## PDF
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is blocking
//! and keeps thread-local state. Extraction therefore runs inside
//! `tokio::task::spawn_blocking`. Pages are visited in document order; each
//! page's text is followed by `"\n"`, and pages with no text are skipped.

use crate::config::GenerationConfig;
use crate::error::ExamGenError;
use crate::pipeline::input::{DocumentKind, SourceDocument};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Extract the text of `document`.
///
/// # Errors
/// Only PDF documents can fail: the pdfium library could not be bound, the
/// document is corrupt, or it is encrypted and the password is missing or
/// wrong.
pub async fn extract(
    document: &SourceDocument,
    config: &GenerationConfig,
) -> Result<String, ExamGenError> {
    match document.kind {
        DocumentKind::PlainText => Ok(decode_text_lossy(&document.content)),
        DocumentKind::PagedDocument => {
            let bytes = document.content.clone();
            let password = config.password.clone();
            let library = config.pdfium_library.clone();

            let pages = tokio::task::spawn_blocking(move || {
                extract_pages_blocking(&bytes, password.as_deref(), library.as_deref())
            })
            .await
            .map_err(|e| ExamGenError::Internal(format!("Extraction task panicked: {}", e)))??;

            Ok(assemble_pages(pages))
        }
    }
}

/// Decode UTF-8, silently dropping every invalid byte sequence.
pub fn decode_text_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut dropped = 0usize;
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
        dropped += chunk.invalid().len();
    }
    if dropped > 0 {
        debug!("Dropped {} invalid UTF-8 bytes", dropped);
    }
    out
}

/// Join per-page texts in order, newline-terminating each non-empty page.
///
/// `None` (extraction failed) and `Some("")` pages are skipped.
pub fn assemble_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut text = String::new();
    for page in pages.into_iter().flatten() {
        if page.is_empty() {
            continue;
        }
        text.push_str(&page);
        text.push('\n');
    }
    text
}

/// Bind pdfium: explicit library path if configured, else the system library.
fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, ExamGenError> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExamGenError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of PDF text extraction.
///
/// Returns one entry per page in document order; `None` marks a page whose
/// text layer could not be read.
fn extract_pages_blocking(
    bytes: &[u8],
    password: Option<&str>,
    library: Option<&Path>,
) -> Result<Vec<Option<String>>, ExamGenError> {
    let pdfium = bind_pdfium(library)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| classify_load_error(e, password.is_some()))?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut results = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        match page.text() {
            Ok(text) => {
                let text = text.all();
                debug!("Page {}: {} chars", idx + 1, text.chars().count());
                results.push(Some(text));
            }
            Err(e) => {
                warn!("Page {}: text extraction failed — {:?}", idx + 1, e);
                results.push(None);
            }
        }
    }

    Ok(results)
}

fn classify_load_error(err: PdfiumError, has_password: bool) -> ExamGenError {
    let err_str = format!("{:?}", err);
    if err_str.contains("Password") || err_str.contains("password") {
        if has_password {
            ExamGenError::WrongPassword
        } else {
            ExamGenError::PasswordRequired
        }
    } else {
        ExamGenError::CorruptDocument { detail: err_str }
    }
}
