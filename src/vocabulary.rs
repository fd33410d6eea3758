//! Stored vocabulary: definitions, their sources and the lookup store.
//!
//! - `definition`: word entries and the record shape sources use
//! - `source`: the source trait with in-memory and JSON file implementations
//! - `cache`: immutable lookup snapshot
//! - `store`: the store with lookups, edits and write-back

pub mod cache;
pub mod definition;
pub mod source;
pub mod store;

pub use self::definition::{WordDefinition, WordRecord, normalize_word};
pub use self::source::{JsonFileSource, MemorySource, VocabularySource, WriteOp};
pub use self::store::{VocabularyStore, VocabularyStoreBuilder};
