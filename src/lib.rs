//! # Glossa
//!
//! Finds known vocabulary inside arbitrary text, including inflected Korean
//! forms of the stored dictionary words.
//!
//! ## Features
//!
//! - Character trie matcher with word-boundary rules and overlap resolution
//! - Korean morphological analysis through a pluggable backend, with a
//!   rule-based fallback
//! - Incremental base form → inflection index over a document collection
//! - Multi-source vocabulary store with debounced write-back
//! - Live matcher snapshots shared through an explicit registry
//!
//! ## Example
//!
//! ```
//! use glossa::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let engine = Engine::new(GlossaConfig::default());
//! engine.add_word(WordDefinition::new("먹다", "to eat", "korean")).unwrap();
//! engine.index_document("note.md", 1, "점심을 먹었다").await;
//! engine.refresh().await;
//!
//! let found = engine.scan("저녁도 먹었다");
//! assert_eq!(found[0].payload, "먹다");
//! # engine.shutdown().await;
//! # });
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod matcher;
pub mod scheduler;
pub mod vocabulary;

pub mod prelude {
    pub use crate::analysis::{MorphologyAnalysisResult, MorphologyAnalyzer};
    pub use crate::config::GlossaConfig;
    pub use crate::engine::Engine;
    pub use crate::error::{GlossaError, Result};
    pub use crate::index::{DocumentEvent, IndexOutcome, MorphologyIndex};
    pub use crate::matcher::{Match, MatcherRegistry, PrefixMatcher, resolve_overlaps};
    pub use crate::vocabulary::{VocabularySource, VocabularyStore, WordDefinition};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
