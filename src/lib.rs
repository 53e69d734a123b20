//! # pdf2md-batch
//!
//! Convert a directory tree of PDF documents to Markdown, translating the
//! pages that are not already in the target language.
//!
//! ## Why this crate?
//!
//! Tender notices, contracts and annexes arrive as PDFs in a mix of
//! languages. Reading them side by side, or feeding them to a search index,
//! needs plain Markdown in one language. This crate reflows the extracted
//! text into headings, lists and paragraphs, translates only what needs it
//! through an LLM backend, and does so resumably over thousands of files.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract    per-page text + metadata via pdfium (spawn_blocking)
//!  ├─ 2. Reflow     headings, list items, joined paragraphs
//!  ├─ 3. Classify   density heuristic: does this page need translating?
//!  ├─ 4. Chunk      lossless split at natural breaks under a size ceiling
//!  ├─ 5. Translate  paced, retried LLM calls; failures keep the original
//!  └─ 6. Assemble   title, metadata comment, "## Page N" sections
//! ```
//!
//! Around it, [`BatchConverter`] discovers files, mirrors the directory tree,
//! and records every finished file in a checkpoint so an interrupted run
//! picks up where it stopped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_batch::{BatchConfig, BatchConverter, LlmTranslator, PdfiumTextSource, Translator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder("pdfs", "markdown")
//!         .chunk_max_size(3500)
//!         .file_limit(Some(10))
//!         .build()?;
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let translator: Arc<dyn Translator> =
//!         Arc::new(LlmTranslator::from_config(&config.conversion)?);
//!     let batch = BatchConverter::new(
//!         config,
//!         Arc::new(PdfiumTextSource::new()),
//!         Some(translator),
//!     )?;
//!     let summary = batch.run().await?;
//!     eprintln!("{} succeeded, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md-batch` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2md-batch = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod checkpoint;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod translator;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{discover_files, BatchConverter, InterruptHandle};
pub use checkpoint::{CheckpointStore, CompletionSet, JsonFileCheckpoint, MemoryCheckpoint};
pub use config::{
    BatchConfig, BatchConfigBuilder, ClassifierThresholds, ConversionConfig,
    ConversionConfigBuilder, TranslationMode, DEFAULT_CHECKPOINT_FILE, MAX_RETRIES,
};
pub use convert::{write_atomic, Converter};
pub use document::{Document, DocumentMetadata, Page, RawDocument};
pub use error::{Pdf2MdError, TranslateError};
pub use output::{BatchSummary, ConversionOutput, ConversionStats, FileOutcome};
pub use pipeline::extract::{PdfTextSource, PdfiumTextSource};
pub use progress::{BatchProgress, BatchProgressCallback, NoopProgressCallback};
pub use translator::{LlmTranslator, MockBehavior, MockTranslator, Translator};
