//! Text reflow: raw page text → Markdown lines.
//!
//! PDF text extraction yields one line per visual line of the page, so a
//! paragraph arrives broken at every column edge. This stage classifies each
//! line with a small set of ordered pattern rules and re-joins runs of plain
//! lines into paragraphs.
//!
//! ## Rules (first match wins)
//!
//! 1. All-uppercase line, 4–99 characters → `### LINE` heading
//! 2. `<digits>.` followed by whitespace → ordered-list item, kept verbatim
//! 3. Leading bullet glyph (`•`, `▪`, `◦`, …) → `- item`
//! 4. Already `- item` / `* item` → list item, kept verbatim
//! 5. Anything else → plain text, joined into the running paragraph
//!
//! Uppercase detection is a heuristic: a short acronym-only line such as
//! `NASA ESA` becomes a heading. That is accepted.

use once_cell::sync::Lazy;
use regex::Regex;

/// Line emitted for a page without any extractable text.
pub const EMPTY_PAGE_PLACEHOLDER: &str = "*[Page has no text or contains only images]*";

/// Knobs for [`reflow_page`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReflowOptions {
    /// Keep blank input lines as (single) empty separator lines.
    pub keep_blank_lines: bool,
}

/// Classification of one stripped input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Heading(String),
    OrderedItem(String),
    BulletItem(String),
    Text(String),
    Blank,
}

static RE_ORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s+").unwrap());

static RE_GLYPH_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[•·▪▫◦‣⁃●○■□►➢]\s*(\S.*)$").unwrap());

static RE_DASH_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*]\s+\S").unwrap());

/// Classify a single line. Leading and trailing whitespace is ignored.
pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if is_heading(line) {
        return LineKind::Heading(format!("### {line}"));
    }
    if RE_ORDERED.is_match(line) {
        return LineKind::OrderedItem(line.to_string());
    }
    if let Some(caps) = RE_GLYPH_BULLET.captures(line) {
        return LineKind::BulletItem(format!("- {}", &caps[1]));
    }
    if RE_DASH_BULLET.is_match(line) {
        return LineKind::BulletItem(line.to_string());
    }
    LineKind::Text(line.to_string())
}

/// At least one uppercase letter, no lowercase letter, length in (3, 100).
fn is_heading(line: &str) -> bool {
    let len = line.chars().count();
    if len <= 3 || len >= 100 {
        return false;
    }
    line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}

/// Reflow one page of extracted text into Markdown lines.
///
/// A whitespace-only page yields [`EMPTY_PAGE_PLACEHOLDER`].
pub fn reflow_page(raw: &str, options: &ReflowOptions) -> Vec<String> {
    if raw.trim().is_empty() {
        return vec![EMPTY_PAGE_PLACEHOLDER.to_string()];
    }

    let mut out: Vec<String> = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();

    for line in raw.lines() {
        match classify_line(line) {
            LineKind::Text(text) => paragraph.push(text),
            LineKind::Blank => {
                flush_paragraph(&mut paragraph, &mut out);
                if options.keep_blank_lines && out.last().is_some_and(|l| !l.is_empty()) {
                    out.push(String::new());
                }
            }
            LineKind::Heading(s) | LineKind::OrderedItem(s) | LineKind::BulletItem(s) => {
                flush_paragraph(&mut paragraph, &mut out);
                out.push(s);
            }
        }
    }
    flush_paragraph(&mut paragraph, &mut out);

    while out.last().is_some_and(String::is_empty) {
        out.pop();
    }
    out
}

fn flush_paragraph(paragraph: &mut Vec<String>, out: &mut Vec<String>) {
    if !paragraph.is_empty() {
        out.push(paragraph.join(" "));
        paragraph.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reflow(raw: &str) -> Vec<String> {
        reflow_page(raw, &ReflowOptions::default())
    }

    #[test]
    fn uppercase_line_of_ten_is_heading() {
        assert_eq!(reflow("ABCDEFGHIJ"), vec!["### ABCDEFGHIJ"]);
    }

    #[test]
    fn uppercase_bounds_are_exclusive() {
        assert_eq!(reflow("ABC"), vec!["ABC"]);
        assert_eq!(reflow("ABCD"), vec!["### ABCD"]);
        let long = "A".repeat(100);
        assert_eq!(reflow(&long), vec![long.clone()]);
        let ok = "A".repeat(99);
        assert_eq!(reflow(&ok), vec![format!("### {ok}")]);
    }

    #[test]
    fn digits_only_line_is_not_heading() {
        assert_eq!(classify_line("2025"), LineKind::Text("2025".into()));
    }

    #[test]
    fn numbered_item_is_kept() {
        assert_eq!(
            reflow("1. Scope of the work\n2. Deadlines"),
            vec!["1. Scope of the work", "2. Deadlines"]
        );
    }

    #[test]
    fn bullet_glyph_becomes_dash() {
        assert_eq!(reflow("•  first point\n▪second"), vec!["- first point", "- second"]);
    }

    #[test]
    fn plain_lines_join_with_single_space() {
        assert_eq!(
            reflow("  The tunnel will be\nbuilt in stages.  "),
            vec!["The tunnel will be built in stages."]
        );
    }

    #[test]
    fn heading_flushes_paragraph_and_is_not_merged() {
        assert_eq!(
            reflow("some text\ncontinues\nGENERAL TERMS\nafter heading"),
            vec![
                "some text continues",
                "### GENERAL TERMS",
                "after heading"
            ]
        );
    }

    #[test]
    fn list_item_flushes_paragraph() {
        assert_eq!(
            reflow("intro line\n- existing item\ntail"),
            vec!["intro line", "- existing item", "tail"]
        );
    }

    #[test]
    fn blank_lines_dropped_by_default() {
        assert_eq!(reflow("para one\n\n\npara two"), vec!["para one", "para two"]);
    }

    #[test]
    fn blank_lines_kept_as_single_separator() {
        let opts = ReflowOptions {
            keep_blank_lines: true,
        };
        assert_eq!(
            reflow_page("\n\npara one\nstill one\n\n\npara two\n\n", &opts),
            vec!["para one still one", "", "para two"]
        );
    }

    #[test]
    fn empty_page_yields_placeholder() {
        assert_eq!(reflow("  \n\t\n"), vec![EMPTY_PAGE_PLACEHOLDER]);
        assert_eq!(reflow(""), vec![EMPTY_PAGE_PLACEHOLDER]);
    }

    #[test]
    fn accented_uppercase_is_heading() {
        assert_eq!(reflow("CONDIÇÕES GERAIS"), vec!["### CONDIÇÕES GERAIS"]);
    }
}
