//! Result and report types.
//!
//! [`TranslationResult`] is the per-page outcome of the translation client.
//! [`DocumentReport`] and [`RunReport`] summarise what the orchestrator did
//! and serialise to JSON for the CLI's `--json` flag.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of translating one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    /// 0-based index of the source page.
    pub source_page_index: usize,
    /// `None` when every attempt failed.
    pub translated_text: Option<String>,
    /// Set when `translated_text` is `None`.
    pub error: Option<PageError>,
}

impl TranslationResult {
    pub fn is_success(&self) -> bool {
        self.translated_text.is_some()
    }
}

/// What happened to one source document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source: PathBuf,
    /// Written output file; `None` if the document failed before or while
    /// writing.
    pub output: Option<PathBuf>,
    /// Pages in the source document (0 if it could not be read).
    pub total_pages: usize,
    /// 1-indexed source page numbers present in the output, in order.
    pub translated_pages: Vec<usize>,
    /// 1-indexed source page numbers composed without their images.
    pub text_only_pages: Vec<usize>,
    pub failed_pages: Vec<PageError>,
    /// Document-level failure (unreadable input, output not writable).
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl DocumentReport {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// True when an output file was written.
    pub fn is_written(&self) -> bool {
        self.output.is_some() && self.error.is_none()
    }
}

/// Summary of a whole run over an input directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub target_language: String,
    pub documents: Vec<DocumentReport>,
    pub total_duration_ms: u64,
}

impl RunReport {
    /// Documents whose output was written.
    pub fn written(&self) -> usize {
        self.documents.iter().filter(|d| d.is_written()).count()
    }

    /// Documents that failed at document level.
    pub fn failed(&self) -> usize {
        self.documents.len() - self.written()
    }

    pub fn translated_pages(&self) -> usize {
        self.documents.iter().map(|d| d.translated_pages.len()).sum()
    }

    pub fn failed_pages(&self) -> usize {
        self.documents.iter().map(|d| d.failed_pages.len()).sum()
    }
}
