//! In-memory document model: a source file's pages before and after reflow.

use crate::pipeline::reflow::{reflow_page, ReflowOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata read from the PDF information dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
}

impl DocumentMetadata {
    /// Non-empty fields as `(key, value)` pairs, in a stable order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("subject", &self.subject),
            ("keywords", &self.keywords),
            ("creator", &self.creator),
            ("producer", &self.producer),
            ("creationDate", &self.creation_date),
            ("modDate", &self.modification_date),
        ]
        .into_iter()
        .filter_map(|(k, v)| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| (k, s))
        })
        .collect()
    }
}

/// Raw output of the page-text capability for one file.
#[derive(Debug, Clone, Default)]
pub struct RawDocument {
    pub metadata: DocumentMetadata,
    /// Extracted text, one entry per page in page order.
    pub pages: Vec<String>,
}

impl RawDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Text of the page at a 0-based index; empty when out of range.
    pub fn page_text(&self, index: usize) -> &str {
        self.pages.get(index).map(String::as_str).unwrap_or("")
    }
}

/// One page of a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub raw_text: String,
    /// Markdown lines produced by the reflow engine.
    pub lines: Vec<String>,
}

impl Page {
    /// The structured lines as one block of Markdown.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// True when the page carried no extractable text.
    pub fn is_blank(&self) -> bool {
        self.raw_text.trim().is_empty()
    }
}

/// A source file and its reflowed pages.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: PathBuf,
    pub metadata: DocumentMetadata,
    pub pages: Vec<Page>,
}

impl Document {
    /// Reflow every page of `raw`, preserving page order.
    pub fn from_raw(source: &Path, raw: RawDocument, options: &ReflowOptions) -> Self {
        let pages = raw
            .pages
            .into_iter()
            .enumerate()
            .map(|(i, raw_text)| {
                let lines = reflow_page(&raw_text, options);
                Page {
                    number: i + 1,
                    raw_text,
                    lines,
                }
            })
            .collect();

        Self {
            source: source.to_path_buf(),
            metadata: raw.metadata,
            pages,
        }
    }

    /// Title for the output: metadata title, else the file stem.
    pub fn title(&self) -> String {
        self.metadata
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                self.source
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "Document".to_string())
            })
    }
}
