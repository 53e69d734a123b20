//! Size-bounded chunking for translation calls.
//!
//! Splits text into consecutive spans of at most `max_chars` characters that
//! together reproduce the input exactly. Each cut is placed after the best
//! natural break found in the back half of the span, in this order of
//! preference:
//!
//! ```text
//! "\n\n"  >  "\n"  >  ". "  "! "  "? "  >  "; "  >  ", "  >  any whitespace
//! ```
//!
//! A run of text with no whitespace that is longer than `max_chars` (a URL,
//! a table rendered without spaces) is never split inside the token: it is
//! emitted as one oversized chunk that ends at the token's end.

use serde::{Deserialize, Serialize};

/// Break points in order of preference.
pub const BREAK_PREFERENCE: [&str; 7] = ["\n\n", "\n", ". ", "! ", "? ", "; ", ", "];

/// One span of the chunked text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Byte offset of the first character in the chunked text.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    pub text: String,
    /// Set by the translation gateway when `text` holds a translation.
    pub translated: bool,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// True when the chunk only exceeds the ceiling because it holds a
    /// single unbreakable token.
    pub fn is_single_token(&self) -> bool {
        !self.text.trim_end().contains(char::is_whitespace)
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Concatenating `chunk.text` in order always yields `text`. A `max_chars`
/// of 0 is treated as 1.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let rest = &text[start..];
        let limit = byte_offset_of_char(rest, max_chars);
        let cut = if limit == rest.len() {
            rest.len()
        } else {
            let window = byte_offset_of_char(rest, max_chars / 2);
            find_break(rest, window, limit)
                .or_else(|| find_whitespace(rest, limit))
                .unwrap_or_else(|| token_end(rest, limit))
        };

        chunks.push(Chunk {
            start,
            end: start + cut,
            text: rest[..cut].to_string(),
            translated: false,
        });
        start += cut;
    }

    chunks
}

/// Byte offset of the `n`-th character of `s`, or `s.len()`.
fn byte_offset_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

/// Last preferred separator fully inside `[window, limit)`; cut after it.
fn find_break(rest: &str, window: usize, limit: usize) -> Option<usize> {
    let span = &rest[window..limit];
    BREAK_PREFERENCE
        .iter()
        .find_map(|sep| span.rfind(sep).map(|pos| window + pos + sep.len()))
}

/// Last whitespace character before `limit`; cut after it.
fn find_whitespace(rest: &str, limit: usize) -> Option<usize> {
    rest[..limit]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .filter(|&cut| cut > 0)
}

/// End of the token that straddles `limit`, including one trailing
/// whitespace character when present.
fn token_end(rest: &str, limit: usize) -> usize {
    rest[limit..]
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map_or(rest.len(), |(i, c)| limit + i + c.len_utf8())
}

/// Concatenate chunk texts in order.
pub fn join_chunks(chunks: &[Chunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_lossless(text: &str, max: usize) {
        let chunks = chunk_text(text, max);
        assert_eq!(join_chunks(&chunks), text, "max={max}");
        let mut expected_start = 0;
        for c in &chunks {
            assert_eq!(c.start, expected_start);
            assert_eq!(&text[c.start..c.end], c.text);
            assert!(!c.text.is_empty());
            assert!(
                c.char_len() <= max || c.is_single_token(),
                "chunk of {} chars over {max}: {:?}",
                c.char_len(),
                c.text
            );
            expected_start = c.end;
        }
        assert_eq!(expected_start, text.len());
    }

    const SAMPLE: &str = "The concession covers the immersed tunnel.\n\n\
        Works start in 2025! Will the schedule hold? The bidder, once selected, \
        signs the contract; the guarantee follows.\nA new line here.\n\n\
        Final paragraph with ação, coração and naïve façade words.";

    #[test]
    fn lossless_across_sizes() {
        for max in [1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 1000] {
            assert_lossless(SAMPLE, max);
        }
    }

    /// Deterministic mixes of words, long tokens, separators and line endings.
    fn generated_inputs() -> Vec<String> {
        const PIECES: [&str; 12] = [
            "word", " ", "\n\n", "\r\n", ". ", "! ", "; ", ", ", "ção", "\t",
            "https://example.org/a/very/long/path/without/any/spaces", "?",
        ];
        let mut seed: u64 = 0x2545_f491;
        let mut inputs = vec![
            "\r\n".repeat(40),
            ". ".repeat(50),
            ", ;".repeat(30),
            "\n\n\n".repeat(10),
            "x".repeat(300),
        ];
        for len in [5, 20, 60, 150] {
            let mut s = String::new();
            for _ in 0..len {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                s.push_str(PIECES[(seed >> 33) as usize % PIECES.len()]);
            }
            inputs.push(s);
        }
        inputs
    }

    #[test]
    fn lossless_on_generated_inputs() {
        for text in generated_inputs() {
            for max in [1, 4, 7, 16, 33, 100] {
                assert_lossless(&text, max);
            }
        }
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_text("", 10).is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("hello world", 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
    }

    #[test]
    fn prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = chunk_text(&text, 40);
        assert_eq!(chunks[0].text, format!("{}\n\n", "a".repeat(30)));
        assert_eq!(chunks[1].text, "b".repeat(30));
    }

    #[test]
    fn prefers_sentence_end_over_comma() {
        let text = "First sentence ends here. Then a clause, and more words follow on";
        let chunks = chunk_text(text, 45);
        assert_eq!(chunks[0].text, "First sentence ends here. ");
    }

    #[test]
    fn falls_back_to_word_boundary() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunk_text(text, 12);
        assert!(chunks.iter().all(|c| c.char_len() <= 12));
        assert_eq!(chunks[0].text, "alpha beta ");
        assert_lossless(text, 12);
    }

    #[test]
    fn long_token_is_kept_whole() {
        let token = "x".repeat(50);
        let text = format!("{token} tail words");
        let chunks = chunk_text(&text, 10);
        assert_eq!(chunks[0].text, format!("{token} "));
        assert!(chunks[0].is_single_token());
        assert_lossless(&text, 10);
    }

    #[test]
    fn multibyte_characters_count_as_one() {
        let text = "ção ".repeat(20);
        let chunks = chunk_text(&text, 8);
        assert!(chunks.iter().all(|c| c.char_len() <= 8));
        assert_lossless(&text, 8);
    }

    #[test]
    fn whitespace_only_is_lossless() {
        assert_lossless("\n\n\n   \n\t\n", 2);
    }
}
