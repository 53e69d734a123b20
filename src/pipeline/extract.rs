//! Page-text extraction: source file → per-page raw text and metadata.
//!
//! [`PdfTextSource`] is the seam between the pipeline and whatever can read
//! a document. [`PdfiumTextSource`] is the production implementation; tests
//! plug in their own.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to call from async contexts. Callers run
//! [`PdfTextSource::extract`] through [`extract_blocking`], which moves the
//! work onto tokio's blocking pool.

use crate::document::{DocumentMetadata, RawDocument};
use crate::error::Pdf2MdError;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Anything that can turn a file into per-page text.
pub trait PdfTextSource: Send + Sync {
    /// Read every page of the file at `path`, in page order.
    fn extract(&self, path: &Path) -> Result<RawDocument, Pdf2MdError>;
}

/// Run [`PdfTextSource::extract`] on the blocking thread pool.
pub async fn extract_blocking(
    source: Arc<dyn PdfTextSource>,
    path: &Path,
) -> Result<RawDocument, Pdf2MdError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || source.extract(&path))
        .await
        .map_err(|e| Pdf2MdError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Text extraction through pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextSource {
    /// Explicit path to the pdfium shared library. When `None`, the working
    /// directory and then the system library path are tried.
    pub library_path: Option<PathBuf>,
    /// Password for encrypted documents.
    pub password: Option<String>,
}

impl PdfiumTextSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    fn bind(&self) -> Result<Pdfium, Pdf2MdError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| Pdf2MdError::PdfiumBindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PdfTextSource for PdfiumTextSource {
    fn extract(&self, path: &Path) -> Result<RawDocument, Pdf2MdError> {
        check_pdf_file(path)?;
        let pdfium = self.bind()?;
        let password = self.password.as_deref();

        let document = pdfium.load_pdf_from_file(path, password).map_err(|e| {
            let detail = format!("{:?}", e);
            if detail.contains("Password") || detail.contains("password") {
                Pdf2MdError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            } else {
                Pdf2MdError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail,
                }
            }
        })?;

        let tags = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            tags.get(tag)
                .map(|t| t.value().trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| Pdf2MdError::ExtractionFailed {
                    path: path.to_path_buf(),
                    page: index + 1,
                    detail: format!("{:?}", e),
                })?
                .all();
            debug!("Page {}: {} chars extracted", index + 1, text.len());
            pages.push(text);
        }
        info!("{}: {} pages extracted", path.display(), pages.len());

        let metadata = DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            keywords: get_meta(PdfDocumentMetadataTagType::Keywords),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: pages.len(),
        };

        Ok(RawDocument { metadata, pages })
    }
}

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub fn check_pdf_file(path: &Path) -> Result<(), Pdf2MdError> {
    if !path.exists() {
        return Err(Pdf2MdError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Pdf2MdError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Pdf2MdError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(Pdf2MdError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}
