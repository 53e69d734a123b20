//! Progress-callback trait for batch conversion events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through the file set. The CLI drives an
//! indicatif progress bar from it; tests use it to count events or to trigger
//! an interruption after a given number of files.
//!
//! # Example
//!
//! ```rust
//! use pdf2md_batch::{BatchConfig, BatchProgressCallback};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counting(AtomicUsize);
//!
//! impl BatchProgressCallback for Counting {
//!     fn on_file_complete(&self, _index: usize, _total: usize, _path: &Path, _pages: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = BatchConfig::builder("PDF", "PDF_Markdown")
//!     .progress_callback(Arc::new(Counting(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::BatchSummary;
use std::path::Path;
use std::sync::Arc;

/// Called by the orchestrator as it processes each file.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the file
/// events arrive from concurrently running conversions. All methods have
/// no-op defaults.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after discovery and checkpoint loading.
    ///
    /// # Arguments
    /// * `total`        — files discovered under the source root
    /// * `already_done` — files skipped because the checkpoint lists them
    /// * `pending`      — files this run will attempt
    fn on_batch_start(&self, total: usize, already_done: usize, pending: usize) {
        let _ = (total, already_done, pending);
    }

    /// Called just before a file is opened. `index` is 1-based over `total`.
    fn on_file_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called after a file's Markdown was written and checkpointed.
    fn on_file_complete(&self, index: usize, total: usize, path: &Path, pages_translated: usize) {
        let _ = (index, total, path, pages_translated);
    }

    /// Called when a file could not be converted. The batch continues.
    fn on_file_error(&self, index: usize, total: usize, path: &Path, error: &str) {
        let _ = (index, total, path, error);
    }

    /// Called once when the run ends, interrupted or not.
    fn on_batch_complete(&self, summary: &BatchSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type BatchProgress = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_file_start(&self, _index: usize, _total: usize, _path: &Path) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _index: usize, _total: usize, _path: &Path, _pages: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _index: usize, _total: usize, _path: &Path, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3, 1, 2);
        cb.on_file_start(1, 2, Path::new("a.pdf"));
        cb.on_file_complete(1, 2, Path::new("a.pdf"), 1);
        cb.on_file_error(2, 2, Path::new("b.pdf"), "corrupt");
        cb.on_batch_complete(&BatchSummary::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = Arc::new(TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        });
        let cb: BatchProgress = tracker.clone();

        cb.on_file_start(1, 2, Path::new("a.pdf"));
        cb.on_file_complete(1, 2, Path::new("a.pdf"), 0);
        cb.on_file_start(2, 2, Path::new("b.pdf"));
        cb.on_file_error(2, 2, Path::new("b.pdf"), "not a pdf");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tracking_counts() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        };
        tracker.on_file_start(1, 1, Path::new("a.pdf"));
        tracker.on_file_error(1, 1, Path::new("a.pdf"), "boom");
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
