//! Pipeline stages for converting one document.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ reflow ──▶ language ──▶ chunk ──▶ translate ──▶ assemble
//! (pdfium)   (lines)    (classify)   (split)   (backend)     (markdown)
//! ```
//!
//! 1. [`extract`]   — per-page raw text and metadata; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 2. [`reflow`]    — raw lines → headings, list items and paragraphs
//! 3. [`language`]  — density heuristic deciding whether text needs
//!    translating; never calls the backend
//! 4. [`chunk`]     — lossless split at natural breaks under a size ceiling
//! 5. [`translate`] — paced, retried backend calls that fall back to the
//!    original text; the only stage with network I/O
//! 6. [`assemble`]  — title, metadata comment, page sections in order
//!
//! [`postprocess`] holds the cleanup rules applied to backend responses and
//! to the assembled document.

pub mod assemble;
pub mod chunk;
pub mod extract;
pub mod language;
pub mod postprocess;
pub mod reflow;
pub mod translate;
