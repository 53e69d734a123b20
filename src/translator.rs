//! The translation backend seam.
//!
//! [`Translator`] is the only thing the pipeline knows about translation: one
//! call, one piece of text, one answer or a [`TranslateError`]. Pacing,
//! retries and timeouts live in [`crate::pipeline::translate`], so every
//! implementation here stays a thin adapter.
//!
//! * [`LlmTranslator`] wraps any `edgequake_llm` provider.
//! * [`MockTranslator`] is a deterministic stand-in for tests and dry runs.

use crate::config::ConversionConfig;
use crate::error::{Pdf2MdError, TranslateError};
use crate::pipeline::postprocess::clean_translation;
use crate::prompts::translation_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A backend that turns text in one language into text in another.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source` to `target` (language codes).
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError>;

    /// Same as [`Translator::translate`], for text that carries page
    /// sentinels which must come back verbatim.
    async fn translate_with_sentinel(
        &self,
        text: &str,
        source: &str,
        target: &str,
        _sentinel: &str,
    ) -> Result<String, TranslateError> {
        self.translate(text, source, target).await
    }
}

// ── LLM-backed translator ────────────────────────────────────────────────

/// Translator that sends each text to a chat-completion provider.
pub struct LlmTranslator {
    provider: Arc<dyn LLMProvider>,
    system_prompt: Option<String>,
    options: CompletionOptions,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ConversionConfig) -> Self {
        Self {
            provider,
            system_prompt: config.system_prompt.clone(),
            options: CompletionOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
                ..Default::default()
            },
        }
    }

    /// Resolve a provider from `config` and the environment.
    pub fn from_config(config: &ConversionConfig) -> Result<Self, Pdf2MdError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    async fn call(&self, prompt: String, text: &str) -> Result<String, TranslateError> {
        let messages = vec![ChatMessage::system(prompt), ChatMessage::user(text)];
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| TranslateError::RequestFailed(format!("{e}")))?;

        debug!(
            "translation call: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        let cleaned = clean_translation(&response.content);
        if cleaned.is_empty() {
            return Err(TranslateError::EmptyResponse);
        }
        Ok(cleaned)
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let prompt = translation_prompt(self.system_prompt.as_deref(), source, target, None);
        self.call(prompt, text).await
    }

    async fn translate_with_sentinel(
        &self,
        text: &str,
        source: &str,
        target: &str,
        sentinel: &str,
    ) -> Result<String, TranslateError> {
        let prompt =
            translation_prompt(self.system_prompt.as_deref(), source, target, Some(sentinel));
        self.call(prompt, text).await
    }
}

/// Default model when a provider is named without one.
const DEFAULT_MODEL: &str = "gpt-4.1-nano";

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, Pdf2MdError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2MdError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`, `config.model`).
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** via [`ProviderFactory::from_env`].
///
/// Failure is [`Pdf2MdError::ProviderNotConfigured`]; callers that can run
/// without translation treat it as a warning.
pub fn resolve_provider(config: &ConversionConfig) -> Result<Arc<dyn LLMProvider>, Pdf2MdError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2MdError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

// ── Mock translator ──────────────────────────────────────────────────────

/// Behaviour of a [`MockTranslator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Prefix the text with `[<target>] `.
    Working,
    /// Upper-case the text.
    Uppercase,
    /// Fail every call.
    Failing,
    /// Answer with nothing usable.
    Empty,
    /// Fail every Nth call, succeed otherwise.
    Intermittent { fail_every: usize },
}

/// Deterministic translator that never touches the network.
#[derive(Debug, Clone)]
pub struct MockTranslator {
    behavior: MockBehavior,
    calls: Arc<AtomicUsize>,
    custom_response: Option<fn(&str) -> String>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Replace successful answers with the output of `generator`.
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Calls received so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        _source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let count = self.calls.fetch_add(1, Ordering::SeqCst);

        let ok = |default: String| -> Result<String, TranslateError> {
            Ok(self.custom_response.map_or(default, |g| g(text)))
        };

        match self.behavior {
            MockBehavior::Working => ok(format!("[{target}] {text}")),
            MockBehavior::Uppercase => ok(text.to_uppercase()),
            MockBehavior::Failing => Err(TranslateError::RequestFailed(
                "simulated backend failure".to_string(),
            )),
            MockBehavior::Empty => Err(TranslateError::EmptyResponse),
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(TranslateError::RequestFailed(format!(
                        "simulated intermittent failure (call #{})",
                        count + 1
                    )))
                } else {
                    ok(format!("[{target}] {text}"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn working_mock_prefixes_target() {
        let t = MockTranslator::working();
        assert_eq!(t.translate("hello", "en", "pt").await.unwrap(), "[pt] hello");
        assert_eq!(t.calls(), 1);
    }

    #[test]
    fn mock_is_usable_from_sync_code() {
        let t = MockTranslator::new(MockBehavior::Uppercase);
        let out = tokio_test::block_on(t.translate("bond", "en", "pt")).unwrap();
        assert_eq!(out, "BOND");
    }

    #[tokio::test]
    async fn failing_mock_errors() {
        let t = MockTranslator::failing();
        assert!(matches!(
            t.translate("hello", "en", "pt").await,
            Err(TranslateError::RequestFailed(_))
        ));
    }

    #[tokio::test]
    async fn intermittent_mock_fails_every_nth() {
        let t = MockTranslator::new(MockBehavior::Intermittent { fail_every: 2 });
        assert!(t.translate("a", "en", "pt").await.is_ok());
        assert!(t.translate("b", "en", "pt").await.is_err());
        assert!(t.translate("c", "en", "pt").await.is_ok());
    }

    #[tokio::test]
    async fn custom_response_overrides_output() {
        let t = MockTranslator::working().with_custom_response(|s| s.replace("hello", "olá"));
        assert_eq!(t.translate("hello there", "en", "pt").await.unwrap(), "olá there");
    }

    #[tokio::test]
    async fn sentinel_call_defaults_to_translate() {
        let t = MockTranslator::new(MockBehavior::Uppercase);
        let out = t
            .translate_with_sentinel("a [[PAGE_BREAK]] b", "en", "pt", "[[PAGE_BREAK]]")
            .await
            .unwrap();
        assert_eq!(out, "A [[PAGE_BREAK]] B");
    }
}
