//! # edgequake-pdf-translate
//!
//! Translate PDF documents page by page with an LLM, keeping their embedded
//! images.
//!
//! ## Why this crate?
//!
//! Each source page becomes one new page: the page's raster images, scaled to
//! fit, followed by the translated text set in Helvetica. The original
//! geometry is not reproduced. What survives is the content in reading order,
//! which is what most translated documents are read for.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract    text + image XObjects per page via lopdf (spawn_blocking)
//!  ├─ 2. Translate  one chat call per page, 3 attempts, 2 s → 4 s backoff
//!  ├─ 3. Compose    decode + scale images, flow paragraphs, text-only fallback
//!  └─ 4. Write      new PDF, temp file + rename
//! ```
//!
//! A page whose translation fails on every attempt is left out; the rest of
//! the document is unaffected.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_translate::{translate_directory, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider defaults to Anthropic via ANTHROPIC_API_KEY.
//!     let config = TranslationConfig::builder()
//!         .target_language("German")
//!         .build()?;
//!     let report = translate_directory(&config).await?;
//!     for doc in &report.documents {
//!         eprintln!("{}: {} pages", doc.source.display(), doc.translated_pages.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-translate` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf-translate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageSize, TranslationConfig, TranslationConfigBuilder};
pub use convert::{resolve_backend, run, translate_directory, translate_directory_sync, translate_pdf};
pub use error::{BackendError, PageError, TranslateError};
pub use output::{DocumentReport, RunReport, TranslationResult};
pub use pipeline::llm::{LlmBackend, TranslationBackend, TranslationRequest};
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
