//! Batch orchestration: convert every document under a directory tree,
//! resumably.
//!
//! ## Lifecycle of a run
//!
//! ```text
//! discover ──▶ load checkpoint ──▶ pending = discovered − completed
//!     ──▶ convert pending files (1..=concurrency at a time)
//!         ├─ success: write output, add to completion set, save checkpoint
//!         └─ failure: count it, log it, move on
//!     ──▶ all discovered files complete? delete checkpoint
//! ```
//!
//! The checkpoint is saved after *every* successful file, under a mutex, so a
//! crash loses at most the files in flight. Saves run on tokio's blocking
//! pool, since the file store writes and fsyncs synchronously. A failed save
//! stops the batch: continuing would produce work that a re-run cannot see.
//!
//! ## Interruption
//!
//! [`InterruptHandle::trigger`] stops new files from starting. Files already
//! in flight finish (their outputs are only ever renamed into place once
//! complete), the completion set is saved, and the summary reports
//! `interrupted`. Running the batch again resumes from the checkpoint.

use crate::checkpoint::{CheckpointStore, CompletionSet, JsonFileCheckpoint};
use crate::config::BatchConfig;
use crate::convert::Converter;
use crate::error::Pdf2MdError;
use crate::output::{BatchSummary, FileOutcome};
use crate::pipeline::extract::PdfTextSource;
use crate::progress::{BatchProgress, NoopProgressCallback};
use crate::translator::Translator;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Cloneable flag that asks a running batch to stop after in-flight files.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Mutable state shared by the file workers.
struct RunState {
    completed: CompletionSet,
    summary: BatchSummary,
}

/// Resumable converter for a directory tree.
pub struct BatchConverter {
    config: BatchConfig,
    converter: Converter,
    checkpoint: Arc<dyn CheckpointStore>,
    progress: BatchProgress,
    interrupt: InterruptHandle,
}

impl BatchConverter {
    /// Create an orchestrator with a JSON checkpoint at
    /// `config.checkpoint_path`.
    pub fn new(
        config: BatchConfig,
        source: Arc<dyn PdfTextSource>,
        translator: Option<Arc<dyn Translator>>,
    ) -> Result<Self, Pdf2MdError> {
        let converter = Converter::new(config.conversion.clone(), source, translator)?;
        let checkpoint: Arc<dyn CheckpointStore> =
            Arc::new(JsonFileCheckpoint::new(config.checkpoint_path.clone()));
        let progress = config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));
        Ok(Self {
            config,
            converter,
            checkpoint,
            progress,
            interrupt: InterruptHandle::new(),
        })
    }

    /// Replace the checkpoint store.
    pub fn with_checkpoint(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint = store;
        self
    }

    /// Handle for requesting a graceful stop from another task.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Every source document under the (canonical) source root, sorted.
    pub fn discover(&self) -> Result<Vec<PathBuf>, Pdf2MdError> {
        let root = self.source_root()?;
        discover_files(&root, &self.config.source_extension)
    }

    /// Output path mirroring `source`'s position under the source root.
    pub fn output_path_for(&self, root: &Path, source: &Path) -> PathBuf {
        let relative = match source.strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => PathBuf::from(source.file_name().unwrap_or_default()),
        };
        self.config
            .dest_root
            .join(relative)
            .with_extension(&self.config.output_extension)
    }

    fn source_root(&self) -> Result<PathBuf, Pdf2MdError> {
        let missing = || Pdf2MdError::SourceRootMissing {
            path: self.config.source_root.clone(),
        };
        let root = self.config.source_root.canonicalize().map_err(|_| missing())?;
        if !root.is_dir() {
            return Err(missing());
        }
        Ok(root)
    }

    /// Run the batch to completion, interruption, or a fatal persistence
    /// error.
    ///
    /// # Errors
    /// Only batch-fatal errors: missing source root, discovery failure, and
    /// checkpoint load/save failures. Per-file failures are counted in the
    /// returned [`BatchSummary`].
    pub async fn run(&self) -> Result<BatchSummary, Pdf2MdError> {
        let root = self.source_root()?;
        let files = discover_files(&root, &self.config.source_extension)?;
        let completed = self.checkpoint.load()?;

        let already_done = files
            .iter()
            .filter(|f| completed.contains(&file_id(f)))
            .count();
        let mut pending: Vec<PathBuf> = files
            .iter()
            .filter(|f| !completed.contains(&file_id(f)))
            .cloned()
            .collect();
        if let Some(limit) = self.config.file_limit {
            pending.truncate(limit);
        }

        info!(
            "Batch: {} file(s) found, {} already done, {} to process{}",
            files.len(),
            already_done,
            pending.len(),
            if self.converter.translation_enabled() {
                ""
            } else {
                " (translation disabled)"
            }
        );
        self.progress
            .on_batch_start(files.len(), already_done, pending.len());

        let state = Mutex::new(RunState {
            completed,
            summary: BatchSummary {
                total: files.len(),
                already_done,
                ..Default::default()
            },
        });

        let batch_total = pending.len();
        let mut results = stream::iter(
            pending
                .into_iter()
                .enumerate()
                .map(|(i, path)| self.process_file(i + 1, batch_total, path, &root, &state)),
        )
        .buffer_unordered(self.config.concurrency.max(1));

        while let Some(result) = results.next().await {
            if let Err(e) = result {
                error!("Batch aborted: {}", e);
                return Err(e);
            }
        }
        drop(results);

        let RunState {
            completed,
            mut summary,
        } = state.into_inner();

        summary.interrupted = self.interrupt.is_triggered();
        summary.remaining = files
            .iter()
            .filter(|f| !completed.contains(&file_id(f)))
            .count();

        if summary.interrupted {
            self.persist(completed).await?;
            warn!(
                "Batch interrupted: {}/{} file(s) complete. Re-run to continue where it stopped.",
                files.len() - summary.remaining,
                files.len()
            );
        }

        if summary.remaining == 0 {
            self.checkpoint.clear()?;
            summary.checkpoint_cleared = true;
            info!("All files complete; checkpoint removed");
        }

        info!(
            "Batch finished: {} total, {} succeeded, {} failed, {} remaining",
            summary.total, summary.succeeded, summary.failed, summary.remaining
        );
        self.progress.on_batch_complete(&summary);
        Ok(summary)
    }

    /// Save `set` through the checkpoint store on the blocking pool.
    async fn persist(&self, set: CompletionSet) -> Result<(), Pdf2MdError> {
        let store = Arc::clone(&self.checkpoint);
        tokio::task::spawn_blocking(move || store.save(&set))
            .await
            .map_err(|e| Pdf2MdError::Internal(format!("Checkpoint task panicked: {}", e)))?
    }

    /// Convert one file and record the outcome. `Err` only for a failed
    /// checkpoint save.
    async fn process_file(
        &self,
        index: usize,
        total: usize,
        path: PathBuf,
        root: &Path,
        state: &Mutex<RunState>,
    ) -> Result<(), Pdf2MdError> {
        if self.interrupt.is_triggered() {
            return Ok(());
        }

        self.progress.on_file_start(index, total, &path);
        let output = self.output_path_for(root, &path);

        match self.converter.convert_to_file(&path, &output).await {
            Ok(stats) => {
                let mut st = state.lock().await;
                st.completed.insert(file_id(&path));
                self.persist(st.completed.clone()).await?;
                st.summary.succeeded += 1;
                st.summary.outcomes.push(FileOutcome::Succeeded {
                    source: path.clone(),
                    output: output.clone(),
                    pages_translated: stats.pages_translated,
                });
                drop(st);

                info!(
                    "[{}/{}] ✓ {} → {}",
                    index,
                    total,
                    path.display(),
                    output.display()
                );
                self.progress
                    .on_file_complete(index, total, &path, stats.pages_translated);
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("[{}/{}] ✗ {}: {}", index, total, path.display(), reason);

                let mut st = state.lock().await;
                st.summary.failed += 1;
                st.summary.outcomes.push(FileOutcome::Failed {
                    source: path.clone(),
                    reason: reason.clone(),
                });
                drop(st);

                self.progress.on_file_error(index, total, &path, &reason);
            }
        }
        Ok(())
    }
}

/// Identifier stored in the completion set: the absolute path as text.
pub fn file_id(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Recursively list files under `root` whose extension matches `extension`
/// case-insensitively, in sorted order.
///
/// Unreadable subdirectories are skipped with a warning; failing to read
/// `root` itself is [`Pdf2MdError::DiscoveryFailed`].
pub fn discover_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, Pdf2MdError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(Pdf2MdError::DiscoveryFailed {
                    root: root.to_path_buf(),
                    detail: e.to_string(),
                })
            }
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}
