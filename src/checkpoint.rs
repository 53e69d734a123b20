//! Persistence of the completion set between batch runs.
//!
//! The orchestrator only sees [`CheckpointStore`]: load once at start, save
//! after every completed file, clear when the whole batch is done.
//! [`JsonFileCheckpoint`] is the on-disk store; [`MemoryCheckpoint`] backs
//! tests and runs that should not leave state behind.
//!
//! ## File format
//!
//! A JSON array of source-file identifiers, sorted:
//!
//! ```json
//! ["/data/pdfs/a.pdf", "/data/pdfs/sub/b.pdf"]
//! ```
//!
//! An absent file is an empty set.

use crate::error::Pdf2MdError;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Identifiers of fully processed source files.
pub type CompletionSet = BTreeSet<String>;

/// Durable storage for a [`CompletionSet`].
pub trait CheckpointStore: Send + Sync {
    /// Read the persisted set; empty when nothing was saved yet.
    fn load(&self) -> Result<CompletionSet, Pdf2MdError>;

    /// Replace the persisted set.
    fn save(&self, set: &CompletionSet) -> Result<(), Pdf2MdError>;

    /// Remove the persisted state. Clearing an absent checkpoint is not an
    /// error.
    fn clear(&self) -> Result<(), Pdf2MdError>;
}

// ── JSON file store ──────────────────────────────────────────────────────

/// Checkpoint kept in a JSON file, written atomically.
#[derive(Debug, Clone)]
pub struct JsonFileCheckpoint {
    path: PathBuf,
}

impl JsonFileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_failed(&self, detail: impl ToString) -> Pdf2MdError {
        Pdf2MdError::CheckpointWriteFailed {
            path: self.path.clone(),
            detail: detail.to_string(),
        }
    }
}

impl CheckpointStore for JsonFileCheckpoint {
    fn load(&self) -> Result<CompletionSet, Pdf2MdError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CompletionSet::new())
            }
            Err(e) => {
                return Err(Pdf2MdError::CheckpointLoadFailed {
                    path: self.path.clone(),
                    detail: e.to_string(),
                })
            }
        };

        let list: Vec<String> =
            serde_json::from_slice(&bytes).map_err(|e| Pdf2MdError::CheckpointLoadFailed {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;
        debug!(
            "Loaded checkpoint {} ({} entries)",
            self.path.display(),
            list.len()
        );
        Ok(list.into_iter().collect())
    }

    fn save(&self, set: &CompletionSet) -> Result<(), Pdf2MdError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| self.write_failed(e))?;

        let json = serde_json::to_vec_pretty(&set.iter().collect::<Vec<_>>())
            .map_err(|e| self.write_failed(e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| self.write_failed(e))?;
        tmp.write_all(&json).map_err(|e| self.write_failed(e))?;
        tmp.as_file().sync_all().map_err(|e| self.write_failed(e))?;
        tmp.persist(&self.path).map_err(|e| self.write_failed(e.error))?;

        debug!("Checkpoint saved: {} entries", set.len());
        Ok(())
    }

    fn clear(&self) -> Result<(), Pdf2MdError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.write_failed(e)),
        }
    }
}

// ── In-memory store ──────────────────────────────────────────────────────

/// Checkpoint held in memory. `None` means "never saved or cleared".
#[derive(Debug, Default)]
pub struct MemoryCheckpoint {
    state: Mutex<Option<CompletionSet>>,
    fail_saves: bool,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already persisted set.
    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Mutex::new(Some(entries.into_iter().map(Into::into).collect())),
            fail_saves: false,
        }
    }

    /// A store whose every save fails, for exercising persistence errors.
    pub fn failing() -> Self {
        Self {
            state: Mutex::new(None),
            fail_saves: true,
        }
    }

    /// Current persisted set, `None` when absent.
    pub fn snapshot(&self) -> Option<CompletionSet> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CompletionSet>> {
        // A poisoned lock still holds the last fully written set.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CheckpointStore for MemoryCheckpoint {
    fn load(&self) -> Result<CompletionSet, Pdf2MdError> {
        Ok(self.lock().clone().unwrap_or_default())
    }

    fn save(&self, set: &CompletionSet) -> Result<(), Pdf2MdError> {
        if self.fail_saves {
            return Err(Pdf2MdError::CheckpointWriteFailed {
                path: PathBuf::from("<memory>"),
                detail: "simulated write failure".to_string(),
            });
        }
        *self.lock() = Some(set.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Pdf2MdError> {
        *self.lock() = None;
        Ok(())
    }
}
