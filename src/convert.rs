//! Orchestration: source documents → translated output documents.
//!
//! ## Failure scopes
//!
//! Setup problems (no credential, no input files) are returned as
//! [`TranslateError`] before any document is touched. From then on nothing
//! escapes: a document that cannot be read or written is recorded in its
//! [`DocumentReport`] and the run moves on, and a page that cannot be
//! translated or composed is left out of its document.
//!
//! Documents and pages are processed strictly one after the other.

use crate::config::TranslationConfig;
use crate::error::{PageError, TranslateError};
use crate::output::{DocumentReport, RunReport};
use crate::pipeline::compose::compose;
use crate::pipeline::document::{ComposedPage, OutputDocument};
use crate::pipeline::extract::{extract, SourcePage};
use crate::pipeline::input::{discover_sources, output_path_for};
use crate::pipeline::llm::{translate_page, LlmBackend, TranslationBackend};
use crate::progress::{NoopProgressCallback, TranslationProgressCallback};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Model used when Anthropic is picked without an explicit model.
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Translate every PDF in `config.input_dir` into `config.output_dir`.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(TranslateError)` only for setup failures:
/// - no usable LLM provider or credential
/// - input directory missing (it is created) or holding no PDFs
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf_translate::{translate_directory, TranslationConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TranslationConfig::builder()
///     .target_language("Spanish")
///     .input_dir("books")
///     .output_dir("translated_pdfs")
///     .build()?;
/// let report = translate_directory(&config).await?;
/// eprintln!("{} documents written", report.written());
/// # Ok(())
/// # }
/// ```
pub async fn translate_directory(config: &TranslationConfig) -> Result<RunReport, TranslateError> {
    let backend = resolve_backend(config)?;
    let sources = discover_sources(&config.input_dir)?;
    Ok(run(&sources, backend.as_ref(), config).await)
}

/// Synchronous wrapper around [`translate_directory`].
///
/// Creates a temporary tokio runtime internally.
pub fn translate_directory_sync(config: &TranslationConfig) -> Result<RunReport, TranslateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TranslateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(translate_directory(config))
}

/// Translate each of `sources` in order. Always returns a report.
pub async fn run(
    sources: &[PathBuf],
    backend: &dyn TranslationBackend,
    config: &TranslationConfig,
) -> RunReport {
    let start = Instant::now();
    let progress = progress_of(config);
    info!(
        "Translating {} documents into {}",
        sources.len(),
        config.target_language
    );
    progress.on_run_start(sources.len());

    let mut documents = Vec::with_capacity(sources.len());
    for source in sources {
        documents.push(translate_pdf(source, backend, config).await);
    }

    let report = RunReport {
        target_language: config.target_language.clone(),
        documents,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Run complete: {}/{} documents written, {} pages translated, {} pages failed",
        report.written(),
        report.documents.len(),
        report.translated_pages(),
        report.failed_pages()
    );
    report
}

/// Translate one PDF and write `output_dir/{prefix}{stem}.pdf`.
///
/// Never fails: problems are recorded in the returned report.
pub async fn translate_pdf(
    source: &Path,
    backend: &dyn TranslationBackend,
    config: &TranslationConfig,
) -> DocumentReport {
    let start = Instant::now();
    let progress = progress_of(config);
    let mut report = DocumentReport::new(source);
    info!("Translating {}", source.display());

    let pages = match extract(source).await {
        Ok(pages) => pages,
        Err(e) => {
            error!("Skipping {}: {}", source.display(), e);
            progress.on_document_error(source, &e.to_string());
            report.error = Some(e.to_string());
            report.duration_ms = start.elapsed().as_millis() as u64;
            return report;
        }
    };
    let total_pages = pages.len();
    report.total_pages = total_pages;
    progress.on_document_start(source, total_pages);

    let mut output = OutputDocument::new();
    for page in pages {
        let page_num = page.index + 1;
        progress.on_page_start(page_num, total_pages);
        match translate_and_compose(page, backend, config, progress).await {
            Ok((composed, text_len)) => {
                if composed.text_only {
                    report.text_only_pages.push(page_num);
                }
                output.push(composed);
                report.translated_pages.push(page_num);
                progress.on_page_complete(page_num, total_pages, text_len);
            }
            Err(e) => {
                warn!("Page {} of {} left out: {}", page_num, source.display(), e);
                progress.on_page_error(page_num, total_pages, &e.to_string());
                report.failed_pages.push(e);
            }
        }
    }

    let output_path = output_path_for(source, &config.output_dir, &config.output_prefix);
    match persist(output, output_path.clone()).await {
        Ok(()) => {
            info!(
                "Wrote {} ({}/{} pages)",
                output_path.display(),
                report.translated_pages.len(),
                total_pages
            );
            progress.on_document_complete(&output_path, report.translated_pages.len(), total_pages);
            report.output = Some(output_path);
        }
        Err(e) => {
            error!("{}", e);
            progress.on_document_error(source, &e.to_string());
            report.error = Some(e.to_string());
        }
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    report
}

/// Translate one page, then compose it off the async runtime.
async fn translate_and_compose(
    page: SourcePage,
    backend: &dyn TranslationBackend,
    config: &TranslationConfig,
    progress: &dyn TranslationProgressCallback,
) -> Result<(ComposedPage, usize), PageError> {
    let page_num = page.index + 1;
    let result = translate_page(backend, page.index, &page.text, config, progress).await;
    let Some(text) = result.translated_text else {
        return Err(result.error.unwrap_or(PageError::TranslationFailed {
            page: page_num,
            attempts: config.max_attempts,
            detail: "no translation returned".to_string(),
        }));
    };

    let text_len = text.len();
    let page_size = config.page_size;
    let SourcePage { index, images, .. } = page;
    let composed = tokio::task::spawn_blocking(move || compose(index, &text, &images, page_size))
        .await
        .map_err(|e| PageError::ComposeFailed {
            page: page_num,
            detail: format!("composition task panicked: {e}"),
        })?
        .map_err(|e| PageError::ComposeFailed {
            page: page_num,
            detail: e.to_string(),
        })?;
    Ok((composed, text_len))
}

/// Serialise and atomically write the output document.
async fn persist(output: OutputDocument, path: PathBuf) -> Result<(), TranslateError> {
    tokio::task::spawn_blocking(move || output.save(&path))
        .await
        .map_err(|e| TranslateError::Internal(format!("Write task panicked: {}", e)))?
}

fn progress_of(config: &TranslationConfig) -> &dyn TranslationProgressCallback {
    match config.progress_callback {
        Some(ref cb) => cb.as_ref(),
        None => &NoopProgressCallback,
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Resolve the translation backend, from most-specific to least-specific.
///
/// 1. **Custom backend** (`config.backend`) used as-is.
/// 2. **Pre-built provider** (`config.provider`) wrapped in [`LlmBackend`].
/// 3. **Named provider** (`config.provider_name`) created through
///    [`ProviderFactory::create_llm_provider`] once its API key variable is
///    confirmed present.
/// 4. **Anthropic** when `ANTHROPIC_API_KEY` is set, with `config.model` or
///    [`DEFAULT_MODEL`].
///
/// Anything else is [`TranslateError::ProviderNotConfigured`], raised before
/// a single document is read.
pub fn resolve_backend(
    config: &TranslationConfig,
) -> Result<Arc<dyn TranslationBackend>, TranslateError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmBackend::new(provider)))
}

fn resolve_provider(config: &TranslationConfig) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let name = name.to_ascii_lowercase();
        if let Some(var) = credential_var(&name) {
            if !env_present(var) {
                return Err(TranslateError::ProviderNotConfigured {
                    provider: name.clone(),
                    hint: format!("Set {var} in the environment."),
                });
            }
        }
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model_for(&name));
        return create_provider(&name, model);
    }

    if env_present("ANTHROPIC_API_KEY") {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider("anthropic", model);
    }

    Err(TranslateError::ProviderNotConfigured {
        provider: "anthropic".to_string(),
        hint: "ANTHROPIC_API_KEY is not set.\n\
               Export it, or choose another provider with --provider and its API key variable."
            .to_string(),
    })
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    info!("Using provider {} with model {}", name, model);
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        TranslateError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// API key variable a hosted provider needs; `None` for local providers.
fn credential_var(provider: &str) -> Option<&'static str> {
    match provider {
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "gemini" => Some("GEMINI_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        _ => None,
    }
}

fn default_model_for(provider: &str) -> &'static str {
    match provider {
        "openai" => "gpt-4.1-nano",
        "gemini" => "gemini-2.0-flash",
        "mistral" => "mistral-small-latest",
        "ollama" => "llama3.2",
        _ => DEFAULT_MODEL,
    }
}

fn env_present(var: &str) -> bool {
    std::env::var(var).is_ok_and(|v| !v.trim().is_empty())
}
