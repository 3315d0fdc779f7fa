//! Configuration types for PDF translation.
//!
//! All translation behaviour is controlled through [`TranslationConfig`],
//! built via its [`TranslationConfigBuilder`]. One struct holds every knob so
//! a run can be logged, shared across tasks and reproduced.

use crate::error::TranslateError;
use crate::pipeline::layout::Margins;
use crate::pipeline::llm::TranslationBackend;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a translation run.
///
/// Built via [`TranslationConfig::builder()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf_translate::{PageSize, TranslationConfig};
///
/// let config = TranslationConfig::builder()
///     .target_language("French")
///     .page_size(PageSize::A4)
///     .max_attempts(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// Free-form target language name passed to the model, e.g. "Spanish".
    pub target_language: String,

    /// LLM model identifier, e.g. "claude-3-haiku-20240307".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "anthropic", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom translation backend. Takes precedence over everything else.
    pub backend: Option<Arc<dyn TranslationBackend>>,

    /// Sampling temperature. Default: 0.0.
    ///
    /// Translation wants the single most likely rendering, not variety.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Total attempts per page, first call included. Default: 3.
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds; doubles after each
    /// further failure. Default: 2000.
    pub retry_base_delay_ms: u64,

    /// Custom system prompt. If None, uses the built-in translator prompt.
    pub system_prompt: Option<String>,

    /// Size of every generated page. Default: US Letter.
    pub page_size: PageSize,

    /// Output file name prefix. Default: "translated_".
    pub output_prefix: String,

    /// Directory scanned for source PDFs. Default: "books".
    pub input_dir: PathBuf,

    /// Directory translated PDFs are written to. Default: "translated_pdfs".
    pub output_dir: PathBuf,

    /// Receives run, document and page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_language: String::new(),
            model: None,
            provider_name: None,
            provider: None,
            backend: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_attempts: 3,
            retry_base_delay_ms: 2000,
            system_prompt: None,
            page_size: PageSize::default(),
            output_prefix: "translated_".to_string(),
            input_dir: PathBuf::from("books"),
            output_dir: PathBuf::from("translated_pdfs"),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("target_language", &self.target_language)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("backend", &self.backend.as_ref().map(|_| "<dyn TranslationBackend>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("page_size", &self.page_size)
            .field("output_prefix", &self.output_prefix)
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn TranslationProgressCallback>"),
            )
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TranslationConfig`].
#[derive(Debug)]
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl TranslationConfigBuilder {
    pub fn target_language(mut self, language: impl Into<String>) -> Self {
        self.config.target_language = language.into().trim().to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.output_prefix = prefix.into();
        self
    }

    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, TranslateError> {
        let c = &self.config;
        validate_language(&c.target_language)?;
        if c.max_attempts == 0 {
            return Err(TranslateError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        let (width, height) = c.page_size.dimensions();
        let m = Margins::GENEROUS;
        if width <= m.left + m.right || height <= m.top + m.bottom {
            return Err(TranslateError::InvalidConfig(format!(
                "page size {width}x{height} pt leaves no room inside the margins"
            )));
        }
        Ok(self.config)
    }
}

/// Check a target language name: non-empty, letters only.
///
/// The CLI re-prompts on this error; library callers get it from
/// [`TranslationConfigBuilder::build`].
pub fn validate_language(language: &str) -> Result<(), TranslateError> {
    if language.is_empty() {
        return Err(TranslateError::InvalidConfig(
            "target language must not be empty".into(),
        ));
    }
    if !language.chars().all(char::is_alphabetic) {
        return Err(TranslateError::InvalidConfig(format!(
            "target language '{language}' must contain letters only"
        )));
    }
    Ok(())
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Size of the generated pages, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// 8.5 × 11 in (612 × 792 pt). (default)
    #[default]
    Letter,
    /// 210 × 297 mm (595 × 842 pt).
    A4,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    /// `(width, height)` in points.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (595.0, 842.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

impl std::str::FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "letter" => Ok(PageSize::Letter),
            "a4" => Ok(PageSize::A4),
            other => Err(format!("unknown page size '{other}' (expected letter or a4)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = TranslationConfig::default();
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.retry_base_delay_ms, 2000);
        assert_eq!(c.output_prefix, "translated_");
        assert_eq!(c.page_size, PageSize::Letter);
    }

    #[test]
    fn builder_trims_language() {
        let c = TranslationConfig::builder()
            .target_language("  Spanish ")
            .build()
            .unwrap();
        assert_eq!(c.target_language, "Spanish");
    }

    #[test]
    fn language_must_be_alphabetic() {
        assert!(validate_language("Français").is_ok());
        assert!(validate_language("").is_err());
        assert!(validate_language("French2").is_err());
        assert!(validate_language("Brazilian Portuguese").is_err());
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = TranslationConfig::builder()
            .target_language("German")
            .max_attempts(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, TranslateError::InvalidConfig(_)));
    }

    #[test]
    fn page_smaller_than_margins_rejected() {
        let err = TranslationConfig::builder()
            .target_language("German")
            .page_size(PageSize::Custom {
                width: 150.0,
                height: 800.0,
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("margins"));
    }

    #[test]
    fn page_size_parses() {
        assert_eq!("A4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert_eq!("letter".parse::<PageSize>().unwrap().dimensions(), (612.0, 792.0));
        assert!("legal".parse::<PageSize>().is_err());
    }

    #[test]
    fn debug_hides_trait_objects() {
        let c = TranslationConfig::default();
        let s = format!("{c:?}");
        assert!(s.contains("TranslationConfig"));
        assert!(s.contains("provider: None"));
    }
}
