//! Translation gateway: one document's route to the translation backend.
//!
//! The gateway never fails. Every backend error (request failure, empty
//! answer, timeout) is retried with exponential backoff and, once the retry
//! budget is spent, replaced by the chunk's original text. The caller gets a
//! valid, possibly partially translated, result in all cases.
//!
//! ## Pacing
//!
//! `call_delay_ms` is the minimum gap between two consecutive backend calls
//! made *by this gateway*. A gateway is created per document, so the pause
//! never holds back other files converted concurrently.
//!
//! ## Retry Strategy
//!
//! Attempt `n` (1-based) after a failure waits `retry_backoff_ms * 2^(n-1)`,
//! capped at [`MAX_BACKOFF_MS`]: with a 500 ms base and 2 retries that is
//! 500 ms → 1 s.

use crate::config::ConversionConfig;
use crate::error::TranslateError;
use crate::pipeline::chunk::{chunk_text, Chunk};
use crate::translator::Translator;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Upper bound for a single retry delay.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Result of translating one block of text through [`TranslationGateway::translate_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedText {
    pub text: String,
    pub chunks_total: usize,
    pub chunks_translated: usize,
    pub chunks_failed: usize,
}

impl TranslatedText {
    /// At least one chunk was replaced by its translation.
    pub fn any_translated(&self) -> bool {
        self.chunks_translated > 0
    }
}

/// Per-document translation gateway.
pub struct TranslationGateway<'a> {
    translator: Arc<dyn Translator>,
    config: &'a ConversionConfig,
    sentinel: Option<&'a str>,
    last_call: Option<Instant>,
}

impl<'a> TranslationGateway<'a> {
    pub fn new(translator: Arc<dyn Translator>, config: &'a ConversionConfig) -> Self {
        Self {
            translator,
            config,
            sentinel: None,
            last_call: None,
        }
    }

    /// Tell the backend that `sentinel` lines must be returned verbatim.
    pub fn with_sentinel(mut self, sentinel: &'a str) -> Self {
        self.sentinel = Some(sentinel);
        self
    }

    /// Translate one chunk in place.
    ///
    /// Returns `true` when the chunk now holds a translation. Leading and
    /// trailing whitespace is kept from the original so that chunk joins stay
    /// intact; a whitespace-only chunk is never sent.
    pub async fn translate_chunk(&mut self, chunk: &mut Chunk) -> bool {
        let (lead, core, trail) = split_whitespace(&chunk.text);
        if core.is_empty() {
            return false;
        }

        let (translated, succeeded) = self.translate_or_keep(core).await;
        if succeeded {
            chunk.text = format!("{lead}{translated}{trail}");
            chunk.translated = true;
        }
        succeeded
    }

    /// Chunk `text` at the configured ceiling, translate every chunk and join
    /// the results in order.
    pub async fn translate_text(&mut self, text: &str) -> TranslatedText {
        let mut chunks = chunk_text(text, self.config.chunk_max_chars);
        debug!(
            "translating {} chars in {} chunk(s)",
            text.chars().count(),
            chunks.len()
        );

        let mut result = TranslatedText {
            text: String::with_capacity(text.len()),
            chunks_total: 0,
            chunks_translated: 0,
            chunks_failed: 0,
        };

        for chunk in chunks.iter_mut() {
            let core = chunk.text.trim();
            if core.is_empty() || Some(core) == self.sentinel {
                result.text.push_str(&chunk.text);
                continue;
            }
            result.chunks_total += 1;
            if self.translate_chunk(chunk).await {
                result.chunks_translated += 1;
            } else {
                result.chunks_failed += 1;
            }
            result.text.push_str(&chunk.text);
        }

        result
    }

    /// The `(text, succeeded)` contract: on failure the original is returned
    /// unchanged with `false`.
    pub async fn translate_or_keep(&mut self, text: &str) -> (String, bool) {
        match self.call_with_retry(text).await {
            Ok(translated) => (translated, true),
            Err(e) => {
                warn!(
                    "Translation failed after {} attempt(s), keeping original text: {}",
                    self.config.max_retries + 1,
                    e
                );
                (text.to_string(), false)
            }
        }
    }

    async fn call_with_retry(&mut self, text: &str) -> Result<String, TranslateError> {
        let mut last_err = TranslateError::EmptyResponse;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay(self.config.retry_backoff_ms, attempt);
                warn!(
                    "Chunk translation: retry {}/{} after {}ms",
                    attempt,
                    self.config.max_retries,
                    backoff.as_millis()
                );
                sleep(backoff).await;
            }

            self.pace().await;
            match self.call_once(text).await {
                Ok(translated) if !translated.trim().is_empty() => return Ok(translated),
                Ok(_) => last_err = TranslateError::EmptyResponse,
                Err(e) => {
                    debug!("Chunk translation: attempt {} failed: {}", attempt + 1, e);
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }

    async fn call_once(&self, text: &str) -> Result<String, TranslateError> {
        let secs = self.config.api_timeout_secs;
        let source = self.config.source_lang.as_str();
        let target = self.config.target_lang.as_str();
        let call = async {
            match self.sentinel {
                Some(sentinel) => {
                    self.translator
                        .translate_with_sentinel(text, source, target, sentinel)
                        .await
                }
                None => self.translator.translate(text, source, target).await,
            }
        };

        match timeout(Duration::from_secs(secs), call).await {
            Ok(result) => result,
            Err(_) => Err(TranslateError::Timeout { secs }),
        }
    }

    /// Wait until `call_delay_ms` has passed since this gateway's last call.
    async fn pace(&mut self) {
        let delay = Duration::from_millis(self.config.call_delay_ms);
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < delay {
                sleep(delay - elapsed).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}

/// Delay before retry `attempt` (1-based). Saturates instead of overflowing.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// Split `s` into leading whitespace, trimmed core, trailing whitespace.
fn split_whitespace(s: &str) -> (&str, &str, &str) {
    let core_start = s.len() - s.trim_start().len();
    let core_end = s.trim_end().len();
    if core_start >= core_end {
        return (s, "", "");
    }
    (&s[..core_start], &s[core_start..core_end], &s[core_end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::{MockBehavior, MockTranslator};

    fn config(max_retries: u32) -> ConversionConfig {
        ConversionConfig {
            call_delay_ms: 0,
            retry_backoff_ms: 1,
            max_retries,
            chunk_max_chars: 100,
            ..Default::default()
        }
    }

    #[test]
    fn split_whitespace_keeps_edges() {
        assert_eq!(split_whitespace("  ab c\n\n"), ("  ", "ab c", "\n\n"));
        assert_eq!(split_whitespace(" \n "), (" \n ", "", ""));
        assert_eq!(split_whitespace("x"), ("", "x", ""));
    }

    #[tokio::test]
    async fn success_replaces_core_and_keeps_whitespace() {
        let cfg = config(0);
        let mut gw = TranslationGateway::new(Arc::new(MockTranslator::working()), &cfg);
        let mut chunk = chunk_text("Hello world.\n\n", 100).remove(0);
        assert!(gw.translate_chunk(&mut chunk).await);
        assert_eq!(chunk.text, "[pt] Hello world.\n\n");
        assert!(chunk.translated);
    }

    #[tokio::test]
    async fn failure_returns_original_and_false() {
        let cfg = config(2);
        let mock = MockTranslator::failing();
        let mut gw = TranslationGateway::new(Arc::new(mock.clone()), &cfg);
        let (text, ok) = gw.translate_or_keep("keep me").await;
        assert_eq!(text, "keep me");
        assert!(!ok);
        assert_eq!(mock.calls(), 3);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay(500, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(500, 2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(500, 70), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(u64::MAX, 3), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(0, 200), Duration::ZERO);
    }

    #[tokio::test]
    async fn many_retries_never_panic() {
        let cfg = ConversionConfig {
            retry_backoff_ms: 0,
            ..config(65)
        };
        let mock = MockTranslator::failing();
        let mut gw = TranslationGateway::new(Arc::new(mock.clone()), &cfg);
        let (text, ok) = gw.translate_or_keep("keep me").await;
        assert_eq!(text, "keep me");
        assert!(!ok);
        assert_eq!(mock.calls(), 66);
    }

    #[tokio::test]
    async fn empty_response_counts_as_failure() {
        let cfg = config(0);
        let mut gw =
            TranslationGateway::new(Arc::new(MockTranslator::new(MockBehavior::Empty)), &cfg);
        assert_eq!(gw.translate_or_keep("abc").await, ("abc".to_string(), false));
    }

    #[tokio::test]
    async fn retry_recovers_intermittent_failure() {
        let cfg = config(1);
        let mock = MockTranslator::new(MockBehavior::Intermittent { fail_every: 2 });
        let mut gw = TranslationGateway::new(Arc::new(mock.clone()), &cfg);
        assert!(gw.translate_or_keep("one").await.1);
        // Second call fails, the retry succeeds.
        assert_eq!(gw.translate_or_keep("two").await, ("[pt] two".to_string(), true));
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn one_failed_chunk_does_not_affect_siblings() {
        let cfg = config(0);
        let mock = MockTranslator::new(MockBehavior::Intermittent { fail_every: 2 });
        let mut gw = TranslationGateway::new(Arc::new(mock), &cfg);
        let text = format!("{}\n\n{}\n\n{}", "a".repeat(60), "b".repeat(60), "c".repeat(60));
        let out = gw.translate_text(&text).await;
        assert_eq!(out.chunks_total, 3);
        assert_eq!(out.chunks_translated, 2);
        assert_eq!(out.chunks_failed, 1);
        assert_eq!(
            out.text,
            format!(
                "[pt] {}\n\n{}\n\n[pt] {}",
                "a".repeat(60),
                "b".repeat(60),
                "c".repeat(60)
            )
        );
    }

    #[tokio::test]
    async fn all_failures_reproduce_input() {
        let cfg = config(0);
        let mut gw = TranslationGateway::new(Arc::new(MockTranslator::failing()), &cfg);
        let text = "Some sentence here. ".repeat(30);
        let out = gw.translate_text(&text).await;
        assert_eq!(out.text, text);
        assert!(!out.any_translated());
        assert_eq!(out.chunks_failed, out.chunks_total);
    }

    #[tokio::test]
    async fn pacing_spaces_calls() {
        let cfg = ConversionConfig {
            call_delay_ms: 30,
            ..config(0)
        };
        let mut gw = TranslationGateway::new(Arc::new(MockTranslator::working()), &cfg);
        let start = Instant::now();
        gw.translate_or_keep("a").await;
        gw.translate_or_keep("b").await;
        gw.translate_or_keep("c").await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
