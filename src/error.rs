//! Error types for the edgequake-pdf-translate library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`TranslateError`]: **Fatal** for the run (missing credential, invalid
//!   target language, no input files) or for a single source document
//!   (unreadable file, corrupt PDF, output not writable). The orchestrator
//!   records document-level errors in [`crate::output::DocumentReport`] and
//!   moves on to the next document.
//!
//! * [`PageError`]: **Non-fatal**: a single page could not be translated or
//!   composed. The page is omitted from the output document and every other
//!   page is unaffected.
//!
//! [`BackendError`] is the failure of one remote call; the translation client
//! turns a run of them into a [`PageError::TranslationFailed`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf-translate library.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The input directory holds no PDF files.
    #[error("No PDF files found in '{dir}'\nPlace the documents to translate in this directory and run again.")]
    NoInputFiles { dir: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF is encrypted; text and images cannot be read.
    #[error("PDF '{path}' is encrypted and cannot be translated.")]
    Encrypted { path: PathBuf },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the translated output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Recorded in [`crate::output::DocumentReport::failed_pages`]; the page is
/// left out of the output document.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Every translation attempt failed.
    #[error("Page {page}: translation failed after {attempts} attempts: {detail}")]
    TranslationFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },

    /// Neither the full nor the text-only composition succeeded.
    #[error("Page {page}: composition failed: {detail}")]
    ComposeFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::TranslationFailed { page, .. } | PageError::ComposeFailed { page, .. } => {
                *page
            }
        }
    }
}

/// One failed call to the remote translation service.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
