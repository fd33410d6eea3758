//! Unicode word segmentation for text analyzed without a backend.
//!
//! Splits text on Unicode word boundaries (UAX #29), keeps only segments that
//! contain alphanumeric characters, and classifies each segment by script so
//! the rule-based analyzer can skip everything outside the target script.
//!
//! # Examples
//!
//! ```
//! use glossa::analysis::segment::{WordSegmenter, ScriptKind};
//!
//! let words = WordSegmenter::new().segment("나는 공부했다, then slept.");
//! assert_eq!(words[0].text, "나는");
//! assert_eq!(words[1].text, "공부했다");
//! assert_eq!(words[1].kind, ScriptKind::Hangul);
//! assert_eq!(words[2].kind, ScriptKind::Alphanum);
//! ```

use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::script::is_hangul;

/// Script classification of a word segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptKind {
    /// Contains Hangul.
    Hangul,
    /// Contains CJK ideographs.
    Cjk,
    /// Only numeric characters.
    Num,
    /// Latin letters, digits, dashes and underscores.
    Alphanum,
    /// Anything else.
    Other,
}

/// A word segment with its byte offsets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordSegment {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub kind: ScriptKind,
}

/// Splits text into word segments.
#[derive(Clone, Debug, Default)]
pub struct WordSegmenter;

impl WordSegmenter {
    pub fn new() -> Self {
        WordSegmenter
    }

    /// Classify a segment:
    /// - All numeric → Num
    /// - Contains Hangul → Hangul
    /// - Contains CJK → Cjk
    /// - ASCII alphanumeric → Alphanum
    /// - Otherwise → Other
    fn detect_kind(word: &str) -> ScriptKind {
        if word.chars().all(|c| c.is_numeric()) {
            return ScriptKind::Num;
        }

        if word.chars().any(is_hangul) {
            return ScriptKind::Hangul;
        }

        if word.chars().any(|c| {
            matches!(c,
                '\u{4E00}'..='\u{9FFF}' |  // CJK Unified Ideographs
                '\u{3400}'..='\u{4DBF}' |  // CJK Extension A
                '\u{20000}'..='\u{2A6DF}'  // CJK Extension B
            )
        }) {
            return ScriptKind::Cjk;
        }

        if word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return ScriptKind::Alphanum;
        }

        ScriptKind::Other
    }

    /// Word segments of `text`, in order.
    pub fn segment(&self, text: &str) -> Vec<WordSegment> {
        text.split_word_bound_indices()
            .filter(|(_, word)| word.chars().any(|c| c.is_alphanumeric()))
            .map(|(start_offset, word)| WordSegment {
                text: word.to_string(),
                start_offset,
                end_offset: start_offset + word.len(),
                kind: Self::detect_kind(word),
            })
            .collect()
    }
}
