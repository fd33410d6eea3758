//! Incremental morphology index.
//!
//! Every document the host reports is analyzed once per modification stamp
//! into a [`DocumentIndexEntry`]. The [`GlobalIndex`] is the union of all
//! entries; it is never edited directly, only by subtracting an entry's
//! contribution and adding the replacement. Each surface carries a count of
//! the documents that contributed it, so a surface seen in two documents
//! survives the removal of one of them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::analysis::analyzer::MorphologyAnalyzer;
use crate::config::IndexConfig;
use crate::error::Result;
use crate::index::document::{DocumentEvent, DocumentIndexEntry, DocumentStatus, IndexOutcome};

/// Base form → surfaces over all indexed documents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalIndex {
    counts: BTreeMap<String, BTreeMap<String, usize>>,
}

impl GlobalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a DocumentIndexEntry>,
    {
        let mut global = GlobalIndex::new();
        for entry in entries {
            global.add(entry);
        }
        global
    }

    fn add(&mut self, entry: &DocumentIndexEntry) {
        for (base, surface) in entry.pairs() {
            *self
                .counts
                .entry(base.clone())
                .or_default()
                .entry(surface.clone())
                .or_insert(0) += 1;
        }
    }

    fn subtract(&mut self, entry: &DocumentIndexEntry) {
        for (base, surface) in entry.pairs() {
            let Some(surfaces) = self.counts.get_mut(base) else {
                continue;
            };
            if let Some(count) = surfaces.get_mut(surface) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    surfaces.remove(surface);
                }
            }
            if surfaces.is_empty() {
                self.counts.remove(base);
            }
        }
    }

    /// Surfaces known for `base`.
    pub fn inflections(&self, base: &str) -> BTreeSet<String> {
        self.counts
            .get(base)
            .map(|surfaces| surfaces.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, base: &str) -> bool {
        self.counts.contains_key(base)
    }

    pub fn base_forms(&self) -> impl Iterator<Item = &String> {
        self.counts.keys()
    }

    /// Number of base forms.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Plain base form → surfaces map.
    pub fn to_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.counts
            .iter()
            .map(|(base, surfaces)| (base.clone(), surfaces.keys().cloned().collect()))
            .collect()
    }
}

#[derive(Debug)]
struct IndexState {
    enabled: bool,
    entries: HashMap<String, DocumentIndexEntry>,
    status: HashMap<String, DocumentStatus>,
    /// Latest request number per document; results of older requests are
    /// dropped.
    requests: HashMap<String, u64>,
    next_request: u64,
    global: GlobalIndex,
}

impl IndexState {
    fn new(enabled: bool) -> Self {
        IndexState {
            enabled,
            entries: HashMap::new(),
            status: HashMap::new(),
            requests: HashMap::new(),
            next_request: 0,
            global: GlobalIndex::new(),
        }
    }

    /// Drop every entry. Request numbers keep counting so calls still in
    /// flight cannot match a new request.
    fn reset(&mut self, enabled: bool) {
        let next_request = self.next_request;
        *self = IndexState::new(enabled);
        self.next_request = next_request;
    }

    /// Start a request for `id`, superseding any still in flight.
    fn begin_request(&mut self, id: &str) -> u64 {
        self.next_request += 1;
        self.requests.insert(id.to_string(), self.next_request);
        self.next_request
    }

    fn is_latest_request(&self, id: &str, request: u64) -> bool {
        self.requests.get(id) == Some(&request)
    }

    fn replace_entry(&mut self, entry: DocumentIndexEntry) {
        if let Some(previous) = self.entries.remove(&entry.document_id) {
            self.global.subtract(&previous);
        }
        self.global.add(&entry);
        self.status
            .insert(entry.document_id.clone(), DocumentStatus::Indexed);
        self.entries.insert(entry.document_id.clone(), entry);
    }

    fn remove_entry(&mut self, id: &str) -> Option<DocumentIndexEntry> {
        self.begin_request(id);
        let previous = self.entries.remove(id)?;
        self.global.subtract(&previous);
        self.status.insert(id.to_string(), DocumentStatus::Removed);
        Some(previous)
    }
}

/// Per-document and global inflection maps.
#[derive(Debug)]
pub struct MorphologyIndex {
    analyzer: Arc<MorphologyAnalyzer>,
    state: RwLock<IndexState>,
}

impl MorphologyIndex {
    pub fn new(analyzer: Arc<MorphologyAnalyzer>, config: &IndexConfig) -> Self {
        MorphologyIndex {
            analyzer,
            state: RwLock::new(IndexState::new(config.enabled)),
        }
    }

    pub fn analyzer(&self) -> &Arc<MorphologyAnalyzer> {
        &self.analyzer
    }

    pub fn is_enabled(&self) -> bool {
        self.state.read().enabled
    }

    /// Switch indexing on or off. Switching off drops every entry.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.write();
        if state.enabled == enabled {
            return;
        }
        if enabled {
            info!("Morphology index enabled");
            state.enabled = true;
        } else {
            info!(
                "Morphology index disabled, dropping {} documents",
                state.entries.len()
            );
            state.reset(false);
        }
    }

    /// Analyze `content` and replace the document's entry.
    ///
    /// Nothing is analyzed when the stored entry already has `stamp`. When
    /// analysis fails the previous entry stays in place. A call that is
    /// overtaken by a later call or a removal for the same id while it
    /// analyzes stores nothing and returns [`IndexOutcome::Skipped`].
    pub async fn index_document(&self, id: &str, stamp: u64, content: &str) -> IndexOutcome {
        let request = {
            let mut state = self.state.write();
            if !state.enabled {
                return IndexOutcome::Disabled;
            }
            if state
                .entries
                .get(id)
                .is_some_and(|entry| entry.last_modified == stamp)
            {
                return IndexOutcome::Skipped;
            }
            state.begin_request(id)
        };

        let analysis = match self.analyzer.analyze_document(content).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Failed to analyze document '{id}', keeping previous entry: {e}");
                return IndexOutcome::Failed;
            }
        };

        let entry = DocumentIndexEntry::new(id, stamp, analysis.base_form_to_surfaces);
        let mut state = self.state.write();
        if !state.enabled {
            return IndexOutcome::Disabled;
        }
        if !state.is_latest_request(id, request) {
            debug!("Dropping analysis of '{id}' at stamp {stamp}, a newer request superseded it");
            return IndexOutcome::Skipped;
        }
        debug!(
            "Indexed document '{id}' at stamp {stamp}: {} base forms",
            entry.inflections.len()
        );
        state.replace_entry(entry);
        IndexOutcome::Indexed
    }

    /// Drop a document's entry; returns whether there was one.
    pub fn remove_document(&self, id: &str) -> bool {
        let removed = self.state.write().remove_entry(id).is_some();
        if removed {
            debug!("Removed document '{id}' from the morphology index");
        }
        removed
    }

    /// Move a document's entry to a new id.
    ///
    /// An entry already built for `stamp` is re-keyed as is; otherwise the
    /// content is analyzed under the new id.
    pub async fn rename_document(
        &self,
        old_id: &str,
        new_id: &str,
        stamp: u64,
        content: &str,
    ) -> IndexOutcome {
        {
            let mut state = self.state.write();
            if !state.enabled {
                return IndexOutcome::Disabled;
            }
            if let Some(mut entry) = state.remove_entry(old_id)
                && entry.last_modified == stamp
            {
                entry.document_id = new_id.to_string();
                state.begin_request(new_id);
                state.replace_entry(entry);
                return IndexOutcome::Indexed;
            }
        }
        self.index_document(new_id, stamp, content).await
    }

    /// Apply a change reported by the document store.
    pub async fn handle_event(&self, event: &DocumentEvent) -> IndexOutcome {
        match event {
            DocumentEvent::Modified { id, stamp, content } => {
                self.mark_modified(id, *stamp);
                self.index_document(id, *stamp, content).await
            }
            DocumentEvent::Deleted { id } => {
                if !self.is_enabled() {
                    IndexOutcome::Disabled
                } else if self.remove_document(id) {
                    IndexOutcome::Removed
                } else {
                    IndexOutcome::Skipped
                }
            }
            DocumentEvent::Renamed {
                old_id,
                new_id,
                stamp,
                content,
            } => self.rename_document(old_id, new_id, *stamp, content).await,
        }
    }

    /// Record that a document changed after it was indexed.
    pub fn mark_modified(&self, id: &str, stamp: u64) -> DocumentStatus {
        let mut state = self.state.write();
        let newer = state
            .entries
            .get(id)
            .is_some_and(|entry| entry.last_modified < stamp);
        let status = state
            .status
            .get(id)
            .copied()
            .unwrap_or(DocumentStatus::Unindexed);
        if status == DocumentStatus::Indexed && newer {
            state.status.insert(id.to_string(), DocumentStatus::Stale);
            return DocumentStatus::Stale;
        }
        status
    }

    pub fn status(&self, id: &str) -> DocumentStatus {
        self.state
            .read()
            .status
            .get(id)
            .copied()
            .unwrap_or(DocumentStatus::Unindexed)
    }

    /// Every surface of `base` over all documents.
    ///
    /// While the index is disabled this is just `{base}`.
    pub fn global_inflections(&self, base: &str) -> BTreeSet<String> {
        let state = self.state.read();
        if !state.enabled {
            return BTreeSet::from([base.to_string()]);
        }
        state.global.inflections(base)
    }

    /// Surfaces of `base` in one document.
    pub fn document_inflections(&self, base: &str, id: &str) -> BTreeSet<String> {
        let state = self.state.read();
        if !state.enabled {
            return BTreeSet::new();
        }
        state
            .entries
            .get(id)
            .and_then(|entry| entry.inflections.get(base))
            .cloned()
            .unwrap_or_default()
    }

    /// Recompute the global index from the stored entries.
    pub fn rebuild_global_index(&self) {
        let mut state = self.state.write();
        let global = GlobalIndex::from_entries(state.entries.values());
        state.global = global;
        debug!("Rebuilt global index: {} base forms", state.global.len());
    }

    /// Copy of the global base form → surfaces map.
    pub fn global_index(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.state.read().global.to_map()
    }

    pub fn document_count(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn entry(&self, id: &str) -> Option<DocumentIndexEntry> {
        self.state.read().entries.get(id).cloned()
    }

    /// Serialize the per-document entries as JSON.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let state = self.state.read();
        let mut entries: Vec<&DocumentIndexEntry> = state.entries.values().collect();
        entries.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        Ok(serde_json::to_vec(&entries)?)
    }

    /// Replace all entries with a [`snapshot`](Self::snapshot); returns the
    /// number of restored documents.
    pub fn restore(&self, bytes: &[u8]) -> Result<usize> {
        let entries: Vec<DocumentIndexEntry> = if bytes.is_empty() {
            Vec::new()
        } else {
            serde_json::from_slice(bytes)?
        };

        let mut state = self.state.write();
        let enabled = state.enabled;
        state.reset(enabled);
        if !enabled {
            return Ok(0);
        }
        for entry in entries {
            state.replace_entry(entry);
        }
        info!("Restored {} documents into the morphology index", state.entries.len());
        Ok(state.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;

    fn index() -> MorphologyIndex {
        let analyzer = Arc::new(MorphologyAnalyzer::rule_based(AnalyzerConfig::default()));
        MorphologyIndex::new(analyzer, &IndexConfig::default())
    }

    fn union_of_entries(index: &MorphologyIndex) -> BTreeMap<String, BTreeSet<String>> {
        let state = index.state.read();
        let mut union: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entry in state.entries.values() {
            for (base, surface) in entry.pairs() {
                union.entry(base.clone()).or_default().insert(surface.clone());
            }
        }
        union
    }

    #[tokio::test]
    async fn test_index_and_lookup() {
        let index = index();
        let outcome = index.index_document("a.md", 1, "오늘 공부했다").await;
        assert_eq!(outcome, IndexOutcome::Indexed);
        assert!(index.global_inflections("공부하다").contains("공부했다"));
        assert!(index.document_inflections("공부하다", "a.md").contains("공부했다"));
        assert!(index.document_inflections("공부하다", "b.md").is_empty());
        assert_eq!(index.status("a.md"), DocumentStatus::Indexed);
    }

    #[tokio::test]
    async fn test_same_stamp_is_skipped() {
        let index = index();
        index.index_document("a.md", 1, "공부했다").await;
        let outcome = index.index_document("a.md", 1, "먹었다").await;
        assert_eq!(outcome, IndexOutcome::Skipped);
        assert!(index.global_inflections("먹다").is_empty());
    }

    #[tokio::test]
    async fn test_reindex_replaces_contribution() {
        let index = index();
        index.index_document("a.md", 1, "공부했다").await;
        index.index_document("a.md", 2, "먹었다").await;
        assert!(index.global_inflections("공부하다").is_empty());
        assert!(index.global_inflections("먹다").contains("먹었다"));
        assert_eq!(index.global_index(), union_of_entries(&index));
    }

    #[tokio::test]
    async fn test_shared_surface_survives_removal() {
        let index = index();
        index.index_document("a.md", 1, "공부했다 먹었다").await;
        index.index_document("b.md", 1, "공부했다").await;

        assert!(index.remove_document("a.md"));
        assert!(index.global_inflections("공부하다").contains("공부했다"));
        assert!(index.global_inflections("먹다").is_empty());
        assert_eq!(index.status("a.md"), DocumentStatus::Removed);
        assert_eq!(index.global_index(), union_of_entries(&index));
    }

    #[tokio::test]
    async fn test_rename_keeps_entry() {
        let index = index();
        index.index_document("a.md", 5, "공부했다").await;
        let outcome = index.rename_document("a.md", "b.md", 5, "공부했다").await;
        assert_eq!(outcome, IndexOutcome::Indexed);
        assert!(index.entry("a.md").is_none());
        assert!(index.document_inflections("공부하다", "b.md").contains("공부했다"));
        assert_eq!(index.document_count(), 1);
    }

    #[tokio::test]
    async fn test_disabled_index() {
        let index = index();
        index.index_document("a.md", 1, "공부했다").await;
        index.set_enabled(false);

        assert_eq!(index.document_count(), 0);
        assert_eq!(
            index.global_inflections("공부하다"),
            BTreeSet::from(["공부하다".to_string()])
        );
        assert!(index.document_inflections("공부하다", "a.md").is_empty());
        assert_eq!(
            index.index_document("a.md", 2, "공부했다").await,
            IndexOutcome::Disabled
        );
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let index = index();
        assert_eq!(index.status("a.md"), DocumentStatus::Unindexed);
        index.index_document("a.md", 1, "공부했다").await;
        assert_eq!(index.mark_modified("a.md", 1), DocumentStatus::Indexed);
        assert_eq!(index.mark_modified("a.md", 2), DocumentStatus::Stale);
        index.index_document("a.md", 2, "공부했다").await;
        assert_eq!(index.status("a.md"), DocumentStatus::Indexed);
    }

    #[tokio::test]
    async fn test_events() {
        let index = index();
        let modified = DocumentEvent::Modified {
            id: "a.md".to_string(),
            stamp: 1,
            content: "먹었다".to_string(),
        };
        assert_eq!(index.handle_event(&modified).await, IndexOutcome::Indexed);
        assert_eq!(index.handle_event(&modified).await, IndexOutcome::Skipped);

        let deleted = DocumentEvent::Deleted {
            id: "a.md".to_string(),
        };
        assert_eq!(index.handle_event(&deleted).await, IndexOutcome::Removed);
        assert!(index.global_index().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_restore() {
        let index = index();
        index.index_document("a.md", 1, "공부했다").await;
        index.index_document("b.md", 1, "먹었다").await;
        let bytes = index.snapshot().unwrap();

        let restored = self::index();
        assert_eq!(restored.restore(&bytes).unwrap(), 2);
        assert_eq!(restored.global_index(), index.global_index());
        assert_eq!(
            restored.index_document("a.md", 1, "공부했다").await,
            IndexOutcome::Skipped
        );
    }

    #[test]
    fn test_request_numbers_survive_reset() {
        let mut state = IndexState::new(true);
        let before = state.begin_request("a.md");
        state.reset(true);
        let after = state.begin_request("a.md");
        assert!(after > before);
        assert!(!state.is_latest_request("a.md", before));
    }

    #[tokio::test]
    async fn test_rebuild_matches_incremental() {
        let index = index();
        index.index_document("a.md", 1, "공부했다 먹었다").await;
        index.index_document("b.md", 1, "공부합니다").await;
        let incremental = index.global_index();
        index.rebuild_global_index();
        assert_eq!(index.global_index(), incremental);
    }
}
