//! Error types for the edgequake-examgen library.
//!
//! Only genuinely fatal conditions live here. Two things that look like
//! failures are deliberately *not* errors:
//!
//! * a response body that is not in the expected `generated_text` shape is
//!   stringified and parsed anyway;
//! * generated text that is not valid JSON becomes a single fallback record
//!   (see [`crate::output::GeneratedRecord::Fallback`]).
//!
//! Transport failures are errors by default, but can be degraded into a
//! fallback record with [`crate::config::TransportErrorPolicy::Fallback`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-examgen library.
#[derive(Debug, Error)]
pub enum ExamGenError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Notes file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed part-way.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF document is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptDocument { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF document is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF document")]
    WrongPassword,

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction from PDF files needs the pdfium shared library.\n\
  • Install libpdfium system-wide, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Generation errors ─────────────────────────────────────────────────
    /// The generation endpoint did not answer within the configured timeout.
    #[error("Generation service unavailable: no response after {secs}s from '{url}'")]
    RequestTimeout { url: String, secs: u64 },

    /// The generation endpoint answered with a non-success status.
    #[error("Generation service unavailable: HTTP {status} from '{url}': {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// Connection, TLS or body-read failure talking to the endpoint.
    #[error("Generation service unavailable: {reason}")]
    Transport { reason: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the exported CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialisation failed.
    #[error("CSV export failed: {0}")]
    ExportFailed(#[from] csv::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExamGenError {
    /// True for failures of the generation endpoint itself (timeout, HTTP
    /// status, transport). These are the errors the fallback policy absorbs.
    pub fn is_service_unavailable(&self) -> bool {
        matches!(
            self,
            ExamGenError::RequestTimeout { .. }
                | ExamGenError::HttpStatus { .. }
                | ExamGenError::Transport { .. }
        )
    }
}
