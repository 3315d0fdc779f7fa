//! Prompts for the translation model.
//!
//! Every string sent to the model is built here, so the wording can be
//! inspected in tests and changed in one place. Callers can override the
//! system prompt via [`crate::config::TranslationConfig::system_prompt`].

/// Default system prompt, used when `TranslationConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional translator. Translate the given text accurately while maintaining its meaning and style.";

/// The user turn for one page: target language and the page text.
///
/// `text` is passed through untouched, including when it is empty.
pub fn translation_request(text: &str, target_language: &str) -> String {
    format!("Please translate the following text to {target_language}:\n\n{text}")
}
