//! Morphological analysis for the target script.
//!
//! This module turns inflected Korean surface forms into dictionary base forms,
//! either through a pluggable morphological backend or, when none is
//! available, through a table of common grammatical endings.
//!
//! # Module Structure
//!
//! - `script`: target-script detection and Hangul syllable arithmetic
//! - `token`: normalized tokens and analysis results
//! - `backend`: backend traits and the raw token adapter
//! - `pattern`: compound-word rules over adjacent tokens
//! - `ending`: rule-based ending stripper
//! - `segment`: Unicode word segmentation
//! - `analyzer`: the analyzer entry point

pub mod analyzer;
pub mod backend;
pub mod ending;
pub mod pattern;
pub mod script;
pub mod segment;
pub mod token;

pub use self::analyzer::{BackendState, MorphologyAnalyzer, WordAnalyzer};
pub use self::backend::{BackendLoader, MorphemeBackend, RawToken};
pub use self::token::{DocumentAnalysis, MorphToken, MorphologyAnalysisResult};
