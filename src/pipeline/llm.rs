//! Translation client: send one page of text to the model, with retry.
//!
//! This module is deliberately thin. Prompt wording lives in
//! [`crate::prompts`]; the remote service sits behind the
//! [`TranslationBackend`] trait so the retry loop can be driven by a scripted
//! fake in tests and by an `edgequake_llm` provider in production.
//!
//! ## Retry Strategy
//!
//! Up to `max_attempts` calls per page. After each failed attempt except the
//! last the client sleeps [`backoff_delay`]: with the default 2 s base and
//! 3 attempts that is 2 s → 4 s. Nothing else in the pipeline runs during the
//! sleep.

use crate::config::TranslationConfig;
use crate::error::{BackendError, PageError};
use crate::output::TranslationResult;
use crate::progress::TranslationProgressCallback;
use crate::prompts::{translation_request, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Everything one remote call needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl TranslationRequest {
    /// Build the request for `text` from the run configuration.
    pub fn for_text(text: &str, config: &TranslationConfig) -> Self {
        Self {
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            user_message: translation_request(text, &config.target_language),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// A text-in/text-out chat service.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// One attempt. No retry happens at this level.
    async fn complete(&self, request: &TranslationRequest) -> Result<String, BackendError>;
}

/// [`TranslationBackend`] over an `edgequake_llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TranslationBackend for LlmBackend {
    async fn complete(&self, request: &TranslationRequest) -> Result<String, BackendError> {
        let messages = vec![
            ChatMessage::system(request.system_prompt.as_str()),
            ChatMessage::user(request.user_message.as_str()),
        ];
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::new(e.to_string()))?;
        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

fn build_options(request: &TranslationRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

/// Wait before the retry that follows failed attempt `attempt` (1-indexed):
/// `base`, then `2 × base`, `4 × base`, ...
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor)
}

/// Translate one page's text.
///
/// Never returns an error: a page whose every attempt failed comes back with
/// `translated_text: None` and the last failure recorded in `error`. Empty
/// text is sent like any other; an empty reply counts as a failed page and
/// is not retried.
pub async fn translate_page(
    backend: &dyn TranslationBackend,
    page_index: usize,
    text: &str,
    config: &TranslationConfig,
    progress: &dyn TranslationProgressCallback,
) -> TranslationResult {
    let page_num = page_index + 1;
    let start = Instant::now();
    let request = TranslationRequest::for_text(text, config);
    let base = Duration::from_millis(config.retry_base_delay_ms);
    let max_attempts = config.max_attempts.max(1);

    let mut last_err = String::new();
    for attempt in 1..=max_attempts {
        match backend.complete(&request).await {
            Ok(translated) if translated.is_empty() => {
                warn!("Page {}: empty translation on attempt {}", page_num, attempt);
                return TranslationResult {
                    source_page_index: page_index,
                    translated_text: None,
                    error: Some(PageError::TranslationFailed {
                        page: page_num,
                        attempts: attempt,
                        detail: "empty translation".to_string(),
                    }),
                };
            }
            Ok(translated) => {
                debug!(
                    "Page {}: translated on attempt {} in {:?}",
                    page_num,
                    attempt,
                    start.elapsed()
                );
                return TranslationResult {
                    source_page_index: page_index,
                    translated_text: Some(translated),
                    error: None,
                };
            }
            Err(e) => {
                last_err = e.to_string();
                if attempt == max_attempts {
                    warn!(
                        "Page {}: attempt {}/{} failed: {}",
                        page_num, attempt, max_attempts, last_err
                    );
                    break;
                }
                let delay = backoff_delay(attempt, base);
                warn!(
                    "Page {}: attempt {}/{} failed: {}; retrying in {:?}",
                    page_num, attempt, max_attempts, last_err, delay
                );
                progress.on_page_retry(page_num, attempt, delay, &last_err);
                sleep(delay).await;
            }
        }
    }

    TranslationResult {
        source_page_index: page_index,
        translated_text: None,
        error: Some(PageError::TranslationFailed {
            page: page_num,
            attempts: max_attempts,
            detail: last_err,
        }),
    }
}
