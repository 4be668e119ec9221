//! Core data types flowing through the extraction and search pipeline.

use serde::{Deserialize, Serialize};

/// One positionally-labeled unit of text pulled out of a source file:
/// a paragraph, a spreadsheet cell, an OCR pass, or a diagram element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Origin label rendered as `[label]` in the assembled text,
    /// e.g. `段落3`, `画像全体`, `要素5`.
    pub label: String,
    pub text: String,
}

impl Fragment {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Joins fragments into the indexable text blob: one `[label] text` line per
/// fragment, in extractor order. Empty input yields an empty string.
pub fn join_fragments(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| format!("[{}] {}", f.label, f.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The indexable unit submitted to the search engine.
///
/// `id` is a stable hash of the absolute path, so re-indexing upserts the
/// same document instead of colliding with unrelated ones (the engine's
/// primary key is `id`). `content` is the assembled extraction text capped
/// at a fixed character limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub path: String,
    pub filename: String,
    pub content: String,
}

/// One engine-returned hit: the original record fields plus the optional
/// highlighted variant of `content` with matched spans wrapped in the
/// caller-specified tag pair.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub path: String,
    pub filename: String,
    pub content: String,
    pub highlighted: Option<String>,
}
