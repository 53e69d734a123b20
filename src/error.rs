//! Error types for the pdf2md-batch library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2MdError`] — **Fatal** for the unit of work that returned it. From
//!   [`crate::convert`] it means *this file* could not be converted (the batch
//!   records a failure and moves on). From [`crate::batch`] it means the batch
//!   itself cannot continue, e.g. the checkpoint could not be written and
//!   progress can no longer be trusted.
//!
//! * [`TranslateError`] — **Non-fatal**: one chunk could not be translated.
//!   It never crosses the translation gateway; the gateway substitutes the
//!   original chunk text and counts the failure in
//!   [`crate::output::ConversionStats`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2md-batch library.
#[derive(Debug, Error)]
pub enum Pdf2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.")]
    PasswordRequired { path: PathBuf },

    /// Text extraction failed for a specific page.
    #[error("Text extraction failed for page {page} of '{path}': {detail}")]
    ExtractionFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library in the working\n\
directory, or install it on the system library path.\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// The batch source directory does not exist or is not a directory.
    #[error("Source directory not found: '{path}'")]
    SourceRootMissing { path: PathBuf },

    /// Walking the source tree failed.
    #[error("Failed to enumerate source files under '{root}': {detail}")]
    DiscoveryFailed { root: PathBuf, detail: String },

    /// The checkpoint exists but cannot be read or parsed.
    #[error("Failed to load checkpoint '{path}': {detail}")]
    CheckpointLoadFailed { path: PathBuf, detail: String },

    /// The checkpoint could not be written; the batch stops because its
    /// progress could no longer be resumed.
    #[error("Failed to persist checkpoint '{path}': {detail}\nThe batch was stopped to keep it resumable.")]
    CheckpointWriteFailed { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2MdError {
    /// Whether this error means the batch must stop rather than skip a file.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            Pdf2MdError::CheckpointWriteFailed { .. }
                | Pdf2MdError::CheckpointLoadFailed { .. }
                | Pdf2MdError::SourceRootMissing { .. }
                | Pdf2MdError::DiscoveryFailed { .. }
        )
    }
}

/// A non-fatal error for a single translation call.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum TranslateError {
    /// The backend rejected or failed the request.
    #[error("translation request failed: {0}")]
    RequestFailed(String),

    /// The backend answered with nothing usable.
    #[error("translation backend returned an empty response")]
    EmptyResponse,

    /// The call did not finish within the configured time.
    #[error("translation call timed out after {secs}s")]
    Timeout { secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_write_failure_is_batch_fatal() {
        let e = Pdf2MdError::CheckpointWriteFailed {
            path: PathBuf::from("progress.json"),
            detail: "disk full".into(),
        };
        assert!(e.is_batch_fatal());
        assert!(e.to_string().contains("disk full"));
    }

    #[test]
    fn extraction_failure_is_per_file() {
        let e = Pdf2MdError::ExtractionFailed {
            path: PathBuf::from("a.pdf"),
            page: 3,
            detail: "bad stream".into(),
        };
        assert!(!e.is_batch_fatal());
        assert!(e.to_string().contains("page 3"));
    }

    #[test]
    fn timeout_display() {
        let e = TranslateError::Timeout { secs: 60 };
        assert!(e.to_string().contains("60s"));
    }
}
