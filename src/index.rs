//! Base-form → inflection index over the host's documents.
//!
//! - `document`: per-document entries, change events and status
//! - `morphology`: the incremental index itself

pub mod document;
pub mod morphology;

pub use self::document::{DocumentEvent, DocumentIndexEntry, DocumentStatus, IndexOutcome};
pub use self::morphology::{GlobalIndex, MorphologyIndex};
