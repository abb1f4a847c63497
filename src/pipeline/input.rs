//! Input resolution: read a user-supplied notes file into a [`SourceDocument`].
//!
//! The media kind is decided from the file extension first; unknown
//! extensions fall back to sniffing the `%PDF` magic prefix. Anything that is
//! not a PDF is treated as plain text, since plain-text decoding never fails.

use crate::error::ExamGenError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Declared media kind of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// UTF-8 (or nearly UTF-8) text.
    PlainText,
    /// A PDF, extracted page by page.
    PagedDocument,
}

impl DocumentKind {
    /// Classify from a MIME type: `application/pdf` is paged, all else is text.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence.eq_ignore_ascii_case("application/pdf") {
            DocumentKind::PagedDocument
        } else {
            DocumentKind::PlainText
        }
    }

    /// Classify from a file extension, if it is one we recognise.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::PagedDocument),
            "txt" | "text" | "md" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }

    /// Classify raw bytes by the `%PDF` magic prefix.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF") {
            DocumentKind::PagedDocument
        } else {
            DocumentKind::PlainText
        }
    }
}

/// Raw document bytes plus their declared kind. Lives for one invocation.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub content: Vec<u8>,
    pub kind: DocumentKind,
}

impl SourceDocument {
    pub fn new(content: impl Into<Vec<u8>>, kind: DocumentKind) -> Self {
        Self {
            content: content.into(),
            kind,
        }
    }

    /// Build a document whose kind is sniffed from the bytes.
    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let kind = DocumentKind::sniff(&content);
        Self { content, kind }
    }

    /// Build a document from an upload. A declared MIME type wins over
    /// sniffing.
    pub fn from_upload(content: impl Into<Vec<u8>>, mime: Option<&str>) -> Self {
        match mime {
            Some(mime) => Self::new(content, DocumentKind::from_mime(mime)),
            None => Self::from_bytes(content),
        }
    }
}

/// Read a local notes file and classify it.
pub async fn resolve_input(path: impl AsRef<Path>) -> Result<SourceDocument, ExamGenError> {
    let path = path.as_ref();

    let content = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExamGenError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ExamGenError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExamGenError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let kind = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentKind::from_extension)
        .unwrap_or_else(|| DocumentKind::sniff(&content));

    debug!(
        "Resolved {} ({} bytes) as {:?}",
        path.display(),
        content.len(),
        kind
    );
    Ok(SourceDocument { content, kind })
}
