//! Text Extractor: turns uploaded resume documents into plain text.
//!
//! PDF parsing is CPU-bound and `pdf-extract` can panic on malformed input,
//! so each document is parsed inside `tokio::task::spawn_blocking`. A panic
//! surfaces as a `JoinError` and is recorded as a corrupt document.
//!
//! Batches are processed sequentially. One bad document is logged and
//! skipped; only a batch with zero usable documents fails.

pub mod name;

use std::io::Write;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::extraction::name::extract_candidate_name;

/// Extracted text shorter than this (after trimming) is treated as a failed extraction.
pub const MIN_TEXT_CHARS: usize = 50;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Raw document handed in by the caller. Never persisted.
#[derive(Debug, Clone)]
pub struct DocumentRef {
    /// Caller-side identity (a record ID, or `file_<n>` for uploads).
    pub source_id: String,
    pub file_name: String,
    /// Name already on record for this document, for callers ranking a
    /// stored pool. Uploads leave it `None` and the name is guessed from the text.
    pub candidate_name: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedText {
    pub source_id: String,
    pub display_name: String,
    pub text: String,
}

/// Why a document was skipped. `Corrupt` carries parser output for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("document contains no usable text")]
    Empty,

    #[error("document could not be parsed: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionErrorKind {
    Empty,
    Corrupt,
}

impl ExtractionError {
    pub fn kind(&self) -> ExtractionErrorKind {
        match self {
            ExtractionError::Empty => ExtractionErrorKind::Empty,
            ExtractionError::Corrupt(_) => ExtractionErrorKind::Corrupt,
        }
    }
}

/// A per-document failure, kept for diagnostics and never sent to the model.
#[derive(Debug, Clone)]
pub struct ExtractionFailure {
    pub source_id: String,
    pub file_name: String,
    pub error: ExtractionError,
}

#[derive(Debug, Error)]
#[error("none of the {attempted} documents produced usable text")]
pub struct NoUsableDocuments {
    pub attempted: usize,
}

/// Ordered successes plus recorded failures of one batch.
#[derive(Debug, Clone, Default)]
pub struct ExtractedBatch {
    pub documents: Vec<ExtractedText>,
    pub failures: Vec<ExtractionFailure>,
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, document: &DocumentRef) -> Result<ExtractedText, ExtractionError>;
}

/// Extracts every document in order, isolating failures per document.
pub async fn extract_many(
    extractor: &dyn TextExtractor,
    documents: &[DocumentRef],
) -> Result<ExtractedBatch, NoUsableDocuments> {
    let mut batch = ExtractedBatch::default();

    for (index, document) in documents.iter().enumerate() {
        info!(
            "Extracting document {}/{}: {}",
            index + 1,
            documents.len(),
            document.file_name
        );
        match extractor.extract(document).await {
            Ok(text) => {
                info!(
                    "Extracted {} characters from {}",
                    text.text.chars().count(),
                    document.file_name
                );
                batch.documents.push(text);
            }
            Err(error) => {
                warn!(
                    source_id = %document.source_id,
                    "Skipping {}: {error}",
                    document.file_name
                );
                batch.failures.push(ExtractionFailure {
                    source_id: document.source_id.clone(),
                    file_name: document.file_name.clone(),
                    error,
                });
            }
        }
    }

    if batch.documents.is_empty() {
        return Err(NoUsableDocuments {
            attempted: documents.len(),
        });
    }

    info!(
        "Successfully processed {}/{} documents",
        batch.documents.len(),
        documents.len()
    );
    Ok(batch)
}

/// Applies the minimum-length rule and resolves the display name.
pub fn finalize_text(document: &DocumentRef, raw: &str) -> Result<ExtractedText, ExtractionError> {
    let text = raw.trim();
    if text.chars().count() < MIN_TEXT_CHARS {
        return Err(ExtractionError::Empty);
    }

    let display_name = match &document.candidate_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => extract_candidate_name(text, &document.file_name),
    };

    Ok(ExtractedText {
        source_id: document.source_id.clone(),
        display_name,
        text: text.to_string(),
    })
}

/// `pdf-extract` backed extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, document: &DocumentRef) -> Result<ExtractedText, ExtractionError> {
        if !document.bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::Corrupt("missing %PDF header".to_string()));
        }

        let bytes = document.bytes.clone();
        let raw = tokio::task::spawn_blocking(move || extract_pdf_text(&bytes))
            .await
            .map_err(|e| ExtractionError::Corrupt(format!("PDF parser aborted: {e}")))??;

        finalize_text(document, &raw)
    }
}

/// Spools the bytes to a scoped temp file and parses it. The file is unlinked
/// when `spool` drops, on every exit path including unwinding.
fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut spool = tempfile::NamedTempFile::new()
        .map_err(|e| ExtractionError::Corrupt(format!("could not stage document: {e}")))?;
    spool
        .write_all(bytes)
        .and_then(|_| spool.flush())
        .map_err(|e| ExtractionError::Corrupt(format!("could not stage document: {e}")))?;

    pdf_extract::extract_text(spool.path()).map_err(|e| ExtractionError::Corrupt(format!("{e:?}")))
}
