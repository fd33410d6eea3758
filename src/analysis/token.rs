//! Token and result types for morphological analysis.
//!
//! # Core Types
//!
//! - [`MorphToken`] - One backend morpheme after normalization
//! - [`MorphologyAnalysisResult`] - Base form derived for a surface string
//! - [`DocumentAnalysis`] - Base form → surfaces map for a whole text
//!
//! POS tags follow the Sejong tag set used by Korean analyzers (`NNG`, `VV`,
//! `XSV`, `EF`, ...). A tag may be composite (`XSV+EP`) when the backend
//! fuses several morphemes into one token, and may carry a backend-specific
//! suffix after a dash (`VV-R`); the helpers below look at the tag's first
//! component without that suffix.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The infinitive marker every Korean verb/adjective dictionary form ends in.
pub const INFINITIVE_MARKER: char = '다';

/// Stem of the support verb that glues nouns to verb morphology (하다).
pub const EMPTY_SUPPORT_VERB: &str = "하";

/// A backend token normalized into the one shape the analyzer works on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphToken {
    /// Text of the token as it appears in the input.
    pub surface: String,
    /// Base form candidate; for verbs and adjectives the bare stem.
    pub base: String,
    /// POS tag, possibly composite.
    pub pos: String,
    /// Byte span of the token in the analyzed text, when the backend reports it.
    pub span: Option<(usize, usize)>,
}

impl MorphToken {
    /// Create a token without position information.
    pub fn new<S, B, P>(surface: S, base: B, pos: P) -> Self
    where
        S: Into<String>,
        B: Into<String>,
        P: Into<String>,
    {
        MorphToken {
            surface: surface.into(),
            base: base.into(),
            pos: pos.into(),
            span: None,
        }
    }

    /// Attach a byte span.
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some((start, end));
        self
    }

    /// First component of the POS tag (`XSV+EP` → `XSV`, `VV-R` → `VV`).
    pub fn primary_tag(&self) -> &str {
        primary_tag(&self.pos)
    }

    /// Whether the token's primary tag is verb/adjective family.
    pub fn is_predicate(&self) -> bool {
        is_predicate_tag(self.primary_tag())
    }

    /// Whether every component of the tag is a grammatical ending.
    pub fn is_ending(&self) -> bool {
        !self.pos.is_empty() && self.pos.split('+').all(|tag| is_ending_tag(strip_variant(tag)))
    }

    /// Whether this token directly follows `previous` in the source text.
    ///
    /// Morphemes fused into one syllable (하 + 었 in 했) share a span and count
    /// as adjacent. Tokens without spans are assumed adjacent.
    pub fn follows(&self, previous: &MorphToken) -> bool {
        match (previous.span, self.span) {
            (Some((prev_start, prev_end)), Some((start, _))) => {
                start >= prev_start && start <= prev_end
            }
            _ => true,
        }
    }
}

fn strip_variant(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

/// First component of a possibly composite tag.
pub fn primary_tag(pos: &str) -> &str {
    strip_variant(pos.split('+').next().unwrap_or(pos))
}

/// Common and proper nouns.
pub fn is_noun_tag(tag: &str) -> bool {
    matches!(tag, "NNG" | "NNP")
}

/// Verbs, adjectives, auxiliaries, copulas and the verb/adjective-deriving
/// suffixes.
pub fn is_predicate_tag(tag: &str) -> bool {
    matches!(tag, "VV" | "VA" | "VX" | "VCP" | "VCN" | "XSV" | "XSA")
}

/// Pre-final, final, connective and transformative endings.
pub fn is_ending_tag(tag: &str) -> bool {
    matches!(tag, "EP" | "EF" | "EC" | "ETN" | "ETM")
}

/// Append the infinitive marker unless the form already ends in it.
pub fn with_infinitive(stem: &str) -> String {
    if stem.ends_with(INFINITIVE_MARKER) {
        stem.to_string()
    } else {
        format!("{stem}{INFINITIVE_MARKER}")
    }
}

/// Result of analyzing one surface string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MorphologyAnalysisResult {
    /// The analyzed text.
    pub surface: String,
    /// Derived dictionary form.
    pub base_form: String,
    /// POS tag of the result.
    pub pos: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

impl MorphologyAnalysisResult {
    /// Create a result; `confidence` is clamped into [0, 1].
    pub fn new<S, B, P>(surface: S, base_form: B, pos: P, confidence: f32) -> Self
    where
        S: Into<String>,
        B: Into<String>,
        P: Into<String>,
    {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        MorphologyAnalysisResult {
            surface: surface.into(),
            base_form: base_form.into(),
            pos: pos.into(),
            confidence,
        }
    }

    /// Whether the result's tag is verb/adjective family.
    pub fn is_predicate(&self) -> bool {
        is_predicate_tag(primary_tag(&self.pos))
    }

    /// Append the infinitive marker to verb/adjective-family base forms that
    /// lack it.
    pub fn with_infinitive_marker(mut self) -> Self {
        if self.is_predicate() && !self.base_form.is_empty() {
            self.base_form = with_infinitive(&self.base_form);
        }
        self
    }
}

/// Base form → surfaces map of a whole text, plus the per-unit results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    /// Every observed surface, grouped by base form.
    pub base_form_to_surfaces: BTreeMap<String, BTreeSet<String>>,
    /// The kept analysis results in text order.
    pub results: Vec<MorphologyAnalysisResult>,
}

impl DocumentAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a kept result.
    pub fn push(&mut self, result: MorphologyAnalysisResult) {
        if !result.base_form.is_empty() && !result.surface.is_empty() {
            self.base_form_to_surfaces
                .entry(result.base_form.clone())
                .or_default()
                .insert(result.surface.clone());
        }
        self.results.push(result);
    }

    pub fn is_empty(&self) -> bool {
        self.base_form_to_surfaces.is_empty()
    }
}
