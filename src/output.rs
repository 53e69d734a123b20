//! Result types: per-document output and per-batch summary.

use crate::document::DocumentMetadata;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The assembled Markdown for one document plus what happened on the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub markdown: String,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
}

/// Counters for a single document conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages emitted in the Markdown (differs from `total_pages` only after
    /// an assembly mismatch).
    pub output_pages: usize,
    /// Pages the classifier sent to translation with at least one chunk
    /// translated successfully.
    pub pages_translated: usize,
    /// Chunks sent to the backend.
    pub chunks_total: usize,
    /// Chunks whose translation replaced the original text.
    pub chunks_translated: usize,
    /// Chunks that fell back to the original text.
    pub chunks_failed: usize,
    /// The page sentinel did not survive translation.
    pub assembly_mismatch: bool,
    pub duration_ms: u64,
}

/// Per-file outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Succeeded {
        source: PathBuf,
        output: PathBuf,
        pages_translated: usize,
    },
    Failed {
        source: PathBuf,
        reason: String,
    },
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Succeeded { .. })
    }
}

/// Totals reported at the end of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Files discovered under the source root.
    pub total: usize,
    /// Files skipped because an earlier run completed them.
    pub already_done: usize,
    /// Files converted in this run.
    pub succeeded: usize,
    /// Files that failed in this run.
    pub failed: usize,
    /// Discovered files not yet in the completion set when the run ended.
    pub remaining: usize,
    /// The run stopped early on an interruption signal.
    pub interrupted: bool,
    /// The checkpoint was removed because every file is complete.
    pub checkpoint_cleared: bool,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchSummary {
    /// Files complete overall: earlier runs plus this one.
    pub fn completed(&self) -> usize {
        self.already_done + self.succeeded
    }
}
