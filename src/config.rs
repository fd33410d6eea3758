//! Engine configuration.
//!
//! Every section deserializes with defaults, so a configuration file only has
//! to name the values it overrides:
//!
//! ```
//! use glossa::config::GlossaConfig;
//!
//! let config = GlossaConfig::from_json_str(r#"{ "vocabulary": { "write_back_delay_ms": 50 } }"#).unwrap();
//! assert_eq!(config.vocabulary.write_back_delay_ms, 50);
//! assert_eq!(config.matcher.refresh_delay_ms, 300);
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GlossaError, Result};

/// Top-level configuration for [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossaConfig {
    /// Morphological analyzer settings.
    pub analyzer: AnalyzerConfig,
    /// Morphology index settings.
    pub index: IndexConfig,
    /// Vocabulary store settings.
    pub vocabulary: VocabularyConfig,
    /// Live matcher settings.
    pub matcher: MatcherConfig,
}

impl GlossaConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: GlossaConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate()
    }

    pub fn with_analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.index = index;
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: VocabularyConfig) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn with_matcher(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = matcher;
        self
    }
}

/// Settings for [`MorphologyAnalyzer`](crate::analysis::analyzer::MorphologyAnalyzer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// How many trailing ending tokens a merged compound may absorb.
    pub max_ending_lookahead: usize,
    /// Confidence of a noun + support-verb compound.
    pub noun_support_verb_confidence: f32,
    /// Confidence of a root + deriving-suffix compound.
    pub root_derivation_confidence: f32,
    /// Confidence of a verb root + passive auxiliary compound.
    pub passive_voice_confidence: f32,
    /// Confidence of a single verb/adjective token.
    pub verb_token_confidence: f32,
    /// Confidence of the first token with any usable information.
    pub first_token_confidence: f32,
    /// Confidence of the rule-based analyzer when an ending matched.
    pub fallback_matched_confidence: f32,
    /// Confidence of the rule-based analyzer when nothing matched.
    pub fallback_unmatched_confidence: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            max_ending_lookahead: 5,
            noun_support_verb_confidence: 0.95,
            root_derivation_confidence: 0.92,
            passive_voice_confidence: 0.90,
            verb_token_confidence: 0.8,
            first_token_confidence: 0.7,
            fallback_matched_confidence: 0.6,
            fallback_unmatched_confidence: 0.3,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_max_ending_lookahead(mut self, lookahead: usize) -> Self {
        self.max_ending_lookahead = lookahead;
        self
    }

    fn validate(&self) -> Result<()> {
        let confidences = [
            ("noun_support_verb_confidence", self.noun_support_verb_confidence),
            ("root_derivation_confidence", self.root_derivation_confidence),
            ("passive_voice_confidence", self.passive_voice_confidence),
            ("verb_token_confidence", self.verb_token_confidence),
            ("first_token_confidence", self.first_token_confidence),
            ("fallback_matched_confidence", self.fallback_matched_confidence),
            ("fallback_unmatched_confidence", self.fallback_unmatched_confidence),
        ];
        for (name, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(GlossaError::config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Settings for [`MorphologyIndex`](crate::index::morphology::MorphologyIndex).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Whether inflections are collected at all.
    pub enabled: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig { enabled: true }
    }
}

/// How the mastered flag of a definition is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryDetection {
    /// Mastered words are excluded from highlighting.
    #[default]
    Flag,
    /// The flag is ignored and every word is highlighted.
    Disabled,
}

/// Settings for [`VocabularyStore`](crate::vocabulary::store::VocabularyStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Debounce window for batched write-back, in milliseconds.
    pub write_back_delay_ms: u64,
    /// Mastery detection mode.
    pub mastery_detection: MasteryDetection,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        VocabularyConfig {
            write_back_delay_ms: 1000,
            mastery_detection: MasteryDetection::Flag,
        }
    }
}

impl VocabularyConfig {
    pub fn with_write_back_delay_ms(mut self, delay_ms: u64) -> Self {
        self.write_back_delay_ms = delay_ms;
        self
    }

    pub fn with_mastery_detection(mut self, mode: MasteryDetection) -> Self {
        self.mastery_detection = mode;
        self
    }

    pub fn write_back_delay(&self) -> Duration {
        Duration::from_millis(self.write_back_delay_ms)
    }
}

/// Settings for the live matcher refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Debounce window for matcher refreshes after document or vocabulary
    /// changes, in milliseconds.
    pub refresh_delay_ms: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            refresh_delay_ms: 300,
        }
    }
}

impl MatcherConfig {
    pub fn with_refresh_delay_ms(mut self, delay_ms: u64) -> Self {
        self.refresh_delay_ms = delay_ms;
        self
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}
