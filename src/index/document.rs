//! Document-level types of the morphology index.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Inflections observed in one document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIndexEntry {
    pub document_id: String,
    /// Modification stamp of the content this entry was built from.
    pub last_modified: u64,
    /// Base form → surfaces seen in the document.
    pub inflections: BTreeMap<String, BTreeSet<String>>,
}

impl DocumentIndexEntry {
    pub fn new<S: Into<String>>(
        document_id: S,
        last_modified: u64,
        inflections: BTreeMap<String, BTreeSet<String>>,
    ) -> Self {
        DocumentIndexEntry {
            document_id: document_id.into(),
            last_modified,
            inflections,
        }
    }

    /// Iterate over every (base form, surface) pair.
    pub fn pairs(&self) -> impl Iterator<Item = (&String, &String)> {
        self.inflections
            .iter()
            .flat_map(|(base, surfaces)| surfaces.iter().map(move |surface| (base, surface)))
    }
}

/// A change reported by the document store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentEvent {
    Modified {
        id: String,
        stamp: u64,
        content: String,
    },
    Deleted {
        id: String,
    },
    Renamed {
        old_id: String,
        new_id: String,
        stamp: u64,
        content: String,
    },
}

impl DocumentEvent {
    /// Id of the document the event leaves behind.
    pub fn document_id(&self) -> &str {
        match self {
            DocumentEvent::Modified { id, .. } | DocumentEvent::Deleted { id } => id,
            DocumentEvent::Renamed { new_id, .. } => new_id,
        }
    }
}

/// Index state of one document.
///
/// ```text
/// Unindexed ──index──→ Indexed ──mark_modified──→ Stale
///                         ↑                         │
///                         └─────────index───────────┘
/// Indexed | Stale ──remove──→ Removed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Unindexed,
    Indexed,
    Stale,
    Removed,
}

/// What an indexing request did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The stored entry already has this stamp.
    Skipped,
    /// The document was analyzed and its entry replaced.
    Indexed,
    /// Analysis failed; the previous entry is kept.
    Failed,
    /// The document's entry was removed.
    Removed,
    /// Indexing is switched off.
    Disabled,
}
