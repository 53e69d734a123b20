//! Page assembly: per-page Markdown → one output document.
//!
//! Output layout:
//!
//! ```text
//! # <title>
//!
//! <!--
//!   Converted from PDF to Markdown
//!   Automatic translation: en → pt
//!   author: ...
//! -->
//!
//! ## Page 1
//!
//! <content>
//!
//! ## Page 2
//! ...
//! ```
//!
//! Pages are emitted in the order given and never merged or dropped. For the
//! whole-document translation mode, [`join_pages`] and [`split_pages`] inject
//! and recover a page sentinel around the translation call.

use crate::pipeline::postprocess::finalize_document;
use tracing::warn;

/// Separator injected between pages for whole-document translation.
pub const PAGE_SENTINEL: &str = "[[PAGE_BREAK]]";

/// Everything the assembler needs besides the page contents.
#[derive(Debug, Clone, Default)]
pub struct DocumentHeader<'a> {
    pub title: &'a str,
    /// Extra lines for the comment block, e.g. the translation note.
    pub notes: Vec<String>,
    /// `(key, value)` metadata pairs.
    pub metadata: Vec<(&'static str, &'a str)>,
    /// Emit the `<!-- -->` block at all.
    pub include_metadata: bool,
    /// Heading label for page sections.
    pub page_label: &'a str,
}

/// Render the final Markdown document.
pub fn render_document(header: &DocumentHeader<'_>, pages: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", header.title.trim()));

    if header.include_metadata {
        out.push_str("<!--\n");
        out.push_str("  Converted from PDF to Markdown\n");
        for note in &header.notes {
            out.push_str(&format!("  {}\n", note));
        }
        for (key, value) in &header.metadata {
            // "--" would close the comment early.
            out.push_str(&format!("  {}: {}\n", key, value.replace("--", "- -")));
        }
        out.push_str("-->\n\n");
    }

    for (i, content) in pages.iter().enumerate() {
        out.push_str(&format!("## {} {}\n\n", header.page_label, i + 1));
        out.push_str(content.trim_end());
        out.push_str("\n\n");
    }

    finalize_document(&out)
}

/// Join page texts with [`PAGE_SENTINEL`] on its own paragraph.
pub fn join_pages(pages: &[String]) -> String {
    pages.join(&format!("\n\n{PAGE_SENTINEL}\n\n"))
}

/// Split a translated blob back into pages.
///
/// Returns the pages when exactly `expected` parts come back. Otherwise logs
/// a warning and returns the whole blob, sentinels removed, as a single page.
/// The `bool` is `true` on a mismatch.
pub fn split_pages(blob: &str, expected: usize) -> (Vec<String>, bool) {
    let parts: Vec<String> = blob
        .split(PAGE_SENTINEL)
        .map(|p| p.trim().to_string())
        .collect();

    if parts.len() == expected {
        return (parts, false);
    }

    warn!(
        "Page separator mismatch after translation: expected {} page(s), found {}. \
         Treating the document as a single page.",
        expected,
        parts.len()
    );
    let merged = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    (vec![merged], true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(meta: Vec<(&'static str, &'a str)>) -> DocumentHeader<'a> {
        DocumentHeader {
            title: "Edital",
            notes: vec![],
            metadata: meta,
            include_metadata: true,
            page_label: "Page",
        }
    }

    fn page_headings(md: &str) -> Vec<&str> {
        md.lines().filter(|l| l.starts_with("## ")).collect()
    }

    #[test]
    fn pages_keep_order_and_count() {
        let pages: Vec<String> = (1..=5).map(|i| format!("content {i}")).collect();
        let md = render_document(&header(vec![]), &pages);
        assert_eq!(
            page_headings(&md),
            vec!["## Page 1", "## Page 2", "## Page 3", "## Page 4", "## Page 5"]
        );
        let positions: Vec<usize> = pages.iter().map(|p| md.find(p.as_str()).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn layout_matches_expected() {
        let md = render_document(
            &DocumentHeader {
                notes: vec!["Automatic translation: en → pt".into()],
                ..header(vec![("author", "ANTT")])
            },
            &["first".to_string(), "second".to_string()],
        );
        assert_eq!(
            md,
            "# Edital\n\n<!--\n  Converted from PDF to Markdown\n  \
             Automatic translation: en → pt\n  author: ANTT\n-->\n\n\
             ## Page 1\n\nfirst\n\n## Page 2\n\nsecond\n"
        );
    }

    #[test]
    fn metadata_block_can_be_omitted() {
        let md = render_document(
            &DocumentHeader {
                include_metadata: false,
                ..header(vec![("author", "x")])
            },
            &["a".to_string()],
        );
        assert!(!md.contains("<!--"));
        assert!(md.starts_with("# Edital\n\n## Page 1"));
    }

    #[test]
    fn metadata_cannot_close_comment() {
        let md = render_document(&header(vec![("subject", "a --> b")]), &["x".to_string()]);
        assert_eq!(md.matches("-->").count(), 1);
    }

    #[test]
    fn custom_page_label() {
        let md = render_document(
            &DocumentHeader {
                page_label: "Página",
                ..header(vec![])
            },
            &["x".to_string()],
        );
        assert!(md.contains("## Página 1"));
    }

    #[test]
    fn split_round_trips_well_formed_blob() {
        let pages = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let (split, mismatch) = split_pages(&join_pages(&pages), 3);
        assert!(!mismatch);
        assert_eq!(split, pages);
    }

    #[test]
    fn lost_sentinel_degrades_to_single_page() {
        let blob = format!("one\n\n{PAGE_SENTINEL}\n\ntwo and three");
        let (split, mismatch) = split_pages(&blob, 3);
        assert!(mismatch);
        assert_eq!(split, vec!["one\n\ntwo and three".to_string()]);
        let md = render_document(&header(vec![]), &split);
        assert_eq!(page_headings(&md), vec!["## Page 1"]);
        assert!(md.contains("two and three"));
    }

    #[test]
    fn extra_sentinel_degrades_too() {
        let blob = format!("a{PAGE_SENTINEL}b{PAGE_SENTINEL}c");
        let (split, mismatch) = split_pages(&blob, 2);
        assert!(mismatch);
        assert_eq!(split.len(), 1);
    }
}
