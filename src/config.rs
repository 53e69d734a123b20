//! Configuration types for document conversion and batch runs.
//!
//! Per-document behaviour lives in [`ConversionConfig`]; corpus-level
//! behaviour (roots, checkpoint, limits, workers) lives in [`BatchConfig`],
//! which embeds a `ConversionConfig`. Both are built through builders that
//! validate in `build()`, so an orchestrator never starts with a
//! configuration it cannot honour.

use crate::error::Pdf2MdError;
use crate::progress::BatchProgress;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default name of the checkpoint file, relative to the working directory.
pub const DEFAULT_CHECKPOINT_FILE: &str = "conversion_progress.json";

/// Largest accepted `max_retries`.
pub const MAX_RETRIES: u32 = 10;

/// Configuration for converting a single document.
///
/// # Example
/// ```rust
/// use pdf2md_batch::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .source_lang("en")
///     .target_lang("pt")
///     .chunk_max_chars(3000)
///     .build()
///     .unwrap();
/// assert_eq!(config.chunk_max_chars, 3000);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Translate detected source-language text. Default: true.
    pub translate: bool,

    /// Language code text is translated from. Default: "en".
    pub source_lang: String,

    /// Language code of the output corpus. Default: "pt".
    pub target_lang: String,

    /// Ceiling, in characters, for one translation call. Default: 3500.
    ///
    /// Leaves headroom under typical 4k-token completion limits once the
    /// translated text grows relative to the source.
    pub chunk_max_chars: usize,

    /// Translate page by page or as one document stream. Default: per page.
    pub translation_mode: TranslationMode,

    /// Language classifier thresholds.
    pub classifier: ClassifierThresholds,

    /// Keep blank lines from the extracted text as paragraph separators.
    /// Default: false (blank lines are dropped).
    pub keep_blank_lines: bool,

    /// Pause between successive backend calls within one document, in
    /// milliseconds. Default: 300.
    pub call_delay_ms: u64,

    /// Retries per chunk after a failed backend call, at most
    /// [`MAX_RETRIES`]. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Sampling temperature for the translation model. Default: 0.3.
    pub temperature: f32,

    /// Maximum tokens the model may generate per chunk. Default: 4000.
    pub max_tokens: usize,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom system prompt. If None, uses the built-in translation prompt.
    pub system_prompt: Option<String>,

    /// Heading label for each page section ("Page" → "## Page 3").
    pub page_label: String,

    /// Emit the metadata comment block under the title. Default: true.
    pub include_metadata: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            translate: true,
            source_lang: "en".to_string(),
            target_lang: "pt".to_string(),
            chunk_max_chars: 3500,
            translation_mode: TranslationMode::default(),
            classifier: ClassifierThresholds::default(),
            keep_blank_lines: false,
            call_delay_ms: 300,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            temperature: 0.3,
            max_tokens: 4000,
            model: None,
            provider_name: None,
            provider: None,
            system_prompt: None,
            page_label: "Page".to_string(),
            include_metadata: true,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("translate", &self.translate)
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .field("chunk_max_chars", &self.chunk_max_chars)
            .field("translation_mode", &self.translation_mode)
            .field("classifier", &self.classifier)
            .field("keep_blank_lines", &self.keep_blank_lines)
            .field("call_delay_ms", &self.call_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("page_label", &self.page_label)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn translate(mut self, v: bool) -> Self {
        self.config.translate = v;
        self
    }

    pub fn source_lang(mut self, code: impl Into<String>) -> Self {
        self.config.source_lang = code.into().to_lowercase();
        self
    }

    pub fn target_lang(mut self, code: impl Into<String>) -> Self {
        self.config.target_lang = code.into().to_lowercase();
        self
    }

    pub fn chunk_max_chars(mut self, n: usize) -> Self {
        self.config.chunk_max_chars = n;
        self
    }

    pub fn translation_mode(mut self, mode: TranslationMode) -> Self {
        self.config.translation_mode = mode;
        self
    }

    pub fn classifier(mut self, thresholds: ClassifierThresholds) -> Self {
        self.config.classifier = thresholds;
        self
    }

    pub fn keep_blank_lines(mut self, v: bool) -> Self {
        self.config.keep_blank_lines = v;
        self
    }

    pub fn call_delay_ms(mut self, ms: u64) -> Self {
        self.config.call_delay_ms = ms;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
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

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn page_label(mut self, label: impl Into<String>) -> Self {
        self.config.page_label = label.into();
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2MdError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl ConversionConfig {
    fn validate(&self) -> Result<(), Pdf2MdError> {
        if self.chunk_max_chars < 100 {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "Chunk size must be ≥ 100 characters, got {}",
                self.chunk_max_chars
            )));
        }
        if self.source_lang.is_empty() || self.target_lang.is_empty() {
            return Err(Pdf2MdError::InvalidConfig(
                "Source and target language codes must be set".into(),
            ));
        }
        if self.source_lang == self.target_lang {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "Source and target language are both '{}'",
                self.source_lang
            )));
        }
        if self.max_retries > MAX_RETRIES {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "Retries must be ≤ {}, got {}",
                MAX_RETRIES, self.max_retries
            )));
        }
        let t = &self.classifier;
        if t.density_factor < 1.0 || t.density_floor < 0.0 {
            return Err(Pdf2MdError::InvalidConfig(format!(
                "Classifier factor must be ≥ 1.0 and floor ≥ 0, got {} / {}",
                t.density_factor, t.density_floor
            )));
        }
        Ok(())
    }
}

/// Configuration for a batch run over a directory tree.
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory searched recursively for source documents.
    pub source_root: PathBuf,

    /// Directory receiving the mirrored Markdown tree.
    pub dest_root: PathBuf,

    /// Where the completion set is persisted between runs.
    pub checkpoint_path: PathBuf,

    /// Process at most this many pending files in one run.
    pub file_limit: Option<usize>,

    /// Files converted at the same time. Default: 1 (strictly sequential).
    pub concurrency: usize,

    /// Extension of source documents, matched case-insensitively. Default: "pdf".
    pub source_extension: String,

    /// Extension given to output files. Default: "md".
    pub output_extension: String,

    /// Receives per-file and per-batch events.
    pub progress_callback: Option<BatchProgress>,

    /// Per-document settings.
    pub conversion: ConversionConfig,
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("source_root", &self.source_root)
            .field("dest_root", &self.dest_root)
            .field("checkpoint_path", &self.checkpoint_path)
            .field("file_limit", &self.file_limit)
            .field("concurrency", &self.concurrency)
            .field("source_extension", &self.source_extension)
            .field("output_extension", &self.output_extension)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .field("conversion", &self.conversion)
            .finish()
    }
}

impl BatchConfig {
    /// Create a builder for the given source and destination roots.
    pub fn builder(
        source_root: impl Into<PathBuf>,
        dest_root: impl Into<PathBuf>,
    ) -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: BatchConfig {
                source_root: source_root.into(),
                dest_root: dest_root.into(),
                checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT_FILE),
                file_limit: None,
                concurrency: 1,
                source_extension: "pdf".to_string(),
                output_extension: "md".to_string(),
                progress_callback: None,
                conversion: ConversionConfig::default(),
            },
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.checkpoint_path = path.into();
        self
    }

    pub fn file_limit(mut self, limit: Option<usize>) -> Self {
        self.config.file_limit = limit;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn source_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.source_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn output_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.output_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn progress_callback(mut self, cb: BatchProgress) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn conversion(mut self, conversion: ConversionConfig) -> Self {
        self.config.conversion = conversion;
        self
    }

    /// Shorthand for `conversion.translate`.
    pub fn translate(mut self, v: bool) -> Self {
        self.config.conversion.translate = v;
        self
    }

    /// Shorthand for `conversion.chunk_max_chars`.
    pub fn chunk_max_size(mut self, n: usize) -> Self {
        self.config.conversion.chunk_max_chars = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, Pdf2MdError> {
        let c = &self.config;
        if c.source_extension.is_empty() || c.output_extension.is_empty() {
            return Err(Pdf2MdError::InvalidConfig(
                "Source and output extensions must be non-empty".into(),
            ));
        }
        if c.source_extension.eq_ignore_ascii_case(&c.output_extension)
            && c.source_root == c.dest_root
        {
            return Err(Pdf2MdError::InvalidConfig(
                "Output would overwrite the source files".into(),
            ));
        }
        if c.file_limit == Some(0) {
            return Err(Pdf2MdError::InvalidConfig("File limit must be ≥ 1".into()));
        }
        c.conversion.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How text is routed through the translation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TranslationMode {
    /// Classify and translate every page on its own. (default)
    ///
    /// Chunks never cross a page boundary, so page order and count are
    /// preserved by construction.
    #[default]
    PerPage,
    /// Join all pages with a sentinel, classify and translate the whole
    /// stream, then split on the sentinel again. Falls back to a single
    /// page if the backend alters the sentinels.
    WholeDocument,
}

/// Thresholds for the density-based language classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    /// Text with fewer characters than this is never translated.
    pub min_chars: usize,
    /// Source density must exceed target density by this factor.
    pub density_factor: f64,
    /// Source density (hits per 100 words) must exceed this floor.
    pub density_floor: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            min_chars: 50,
            density_factor: 1.5,
            density_floor: 5.0,
        }
    }
}
