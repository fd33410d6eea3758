//! The vocabulary store.
//!
//! Holds every source's definitions in memory and answers lookups from an
//! immutable [`VocabularyCache`] snapshot. Any mutation drops the snapshot; the
//! next lookup rebuilds it in one pass and publishes it with a single swap, so
//! a reader sees either a complete snapshot or none.
//!
//! Edits are applied in memory right away and queued for their source. The
//! queue of a source is written back in one batch once it has been quiet for
//! the configured delay. A failed write is logged; the in-memory state is kept.
//!
//! Words in the target script that have no exact entry are resolved through
//! the morphological analyzer: 공부했습니다 → 공부하다. The resolution runs in
//! the background and its result is cached by surface until the next
//! mutation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::{AHashMap, AHashSet};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;

use crate::analysis::analyzer::MorphologyAnalyzer;
use crate::config::{MasteryDetection, VocabularyConfig};
use crate::error::{GlossaError, Result};
use crate::scheduler::Debouncer;
use crate::vocabulary::cache::VocabularyCache;
use crate::vocabulary::definition::{WordDefinition, WordRecord, normalize_word};
use crate::vocabulary::source::{VocabularySource, WriteOp};

/// Merge `op` into a source's pending batch, keeping one op per node.
fn coalesce(ops: &mut Vec<WriteOp>, op: WriteOp) {
    let Some(at) = ops.iter().position(|queued| queued.node_id() == op.node_id()) else {
        ops.push(op);
        return;
    };

    let merged = match (&ops[at], op) {
        (WriteOp::Create(_), WriteOp::Update(record) | WriteOp::Create(record)) => {
            Some(WriteOp::Create(record))
        }
        (WriteOp::Create(_), WriteOp::Delete { .. }) => None,
        (WriteOp::Delete { .. }, WriteOp::Create(record) | WriteOp::Update(record)) => {
            Some(WriteOp::Update(record))
        }
        (_, op) => Some(op),
    };

    match merged {
        Some(op) => ops[at] = op,
        None => {
            ops.remove(at);
        }
    }
}

struct StoreInner {
    source: Option<Arc<dyn VocabularySource>>,
    analyzer: Option<Arc<MorphologyAnalyzer>>,
    write_back_delay: std::time::Duration,
    mastery: RwLock<MasteryDetection>,

    sources: RwLock<BTreeMap<String, Vec<WordDefinition>>>,
    cache: RwLock<Option<Arc<VocabularyCache>>>,
    /// Bumped on every invalidation.
    epoch: AtomicU64,
    /// Surface → definition found through morphological resolution.
    inflections: RwLock<AHashMap<String, WordDefinition>>,
    in_flight: Mutex<AHashSet<String>>,

    pending: Mutex<BTreeMap<String, Vec<WriteOp>>>,
    debouncers: Mutex<HashMap<String, Arc<Debouncer>>>,
    write_lock: tokio::sync::Mutex<()>,
}

/// Canonical words and their definitions from every source.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct VocabularyStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for VocabularyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocabularyStore")
            .field("source", &self.inner.source.as_ref().map(|s| s.name()))
            .field("sources", &self.inner.sources.read().len())
            .field("cache_valid", &self.is_cache_valid())
            .finish()
    }
}

/// Builder for [`VocabularyStore`].
pub struct VocabularyStoreBuilder {
    config: VocabularyConfig,
    source: Option<Arc<dyn VocabularySource>>,
    analyzer: Option<Arc<MorphologyAnalyzer>>,
}

impl VocabularyStoreBuilder {
    /// Persist edits to `source`.
    pub fn source(mut self, source: Arc<dyn VocabularySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Resolve inflected target-script words with `analyzer`.
    pub fn analyzer(mut self, analyzer: Arc<MorphologyAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn build(self) -> VocabularyStore {
        VocabularyStore {
            inner: Arc::new(StoreInner {
                source: self.source,
                analyzer: self.analyzer,
                write_back_delay: self.config.write_back_delay(),
                mastery: RwLock::new(self.config.mastery_detection),
                sources: RwLock::new(BTreeMap::new()),
                cache: RwLock::new(None),
                epoch: AtomicU64::new(0),
                inflections: RwLock::new(AHashMap::new()),
                in_flight: Mutex::new(AHashSet::new()),
                pending: Mutex::new(BTreeMap::new()),
                debouncers: Mutex::new(HashMap::new()),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }
}

impl VocabularyStore {
    pub fn builder(config: VocabularyConfig) -> VocabularyStoreBuilder {
        VocabularyStoreBuilder {
            config,
            source: None,
            analyzer: None,
        }
    }

    /// In-memory store without write-back or morphological resolution.
    pub fn new(config: VocabularyConfig) -> Self {
        Self::builder(config).build()
    }

    // ---- snapshot ----------------------------------------------------------

    fn invalidate(&self) {
        let mut cache = self.inner.cache.write();
        let mut inflections = self.inner.inflections.write();
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        *cache = None;
        inflections.clear();
    }

    pub fn is_cache_valid(&self) -> bool {
        self.inner.cache.read().is_some()
    }

    /// Build a fresh snapshot from the current definitions and publish it.
    ///
    /// A snapshot built from definitions that changed meanwhile is returned
    /// but not published.
    pub fn rebuild_cache(&self) -> Arc<VocabularyCache> {
        let epoch = self.inner.epoch.load(Ordering::Acquire);
        let snapshot = {
            let sources = self.inner.sources.read();
            Arc::new(VocabularyCache::build(&sources, *self.inner.mastery.read()))
        };

        let mut cache = self.inner.cache.write();
        if self.inner.epoch.load(Ordering::Acquire) == epoch {
            *cache = Some(Arc::clone(&snapshot));
            debug!("Vocabulary cache rebuilt: {} words", snapshot.len());
        }
        snapshot
    }

    /// The current snapshot, rebuilt first if it was invalidated.
    pub fn snapshot(&self) -> Arc<VocabularyCache> {
        if let Some(cache) = self.inner.cache.read().as_ref() {
            return Arc::clone(cache);
        }
        self.rebuild_cache()
    }

    pub fn all_words(&self) -> Vec<String> {
        self.snapshot().all_words().to_vec()
    }

    pub fn unmastered_words(&self) -> Vec<String> {
        self.snapshot().unmastered_words().to_vec()
    }

    pub fn source_words(&self, source_id: &str) -> Vec<String> {
        self.snapshot().source_words(source_id).to_vec()
    }

    /// Ids of every loaded source.
    pub fn source_ids(&self) -> Vec<String> {
        self.inner.sources.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    // ---- lookup ------------------------------------------------------------

    fn lookup(&self, key: &str) -> Option<WordDefinition> {
        if let Some(definition) = self.snapshot().get(key) {
            return Some(definition.clone());
        }
        self.inner.inflections.read().get(key).cloned()
    }

    /// Definition of `word`, from the exact entry or an earlier resolution.
    ///
    /// On a target-script miss a morphological resolution is started in the
    /// background and `None` is returned right away; a later call finds the
    /// resolved definition.
    pub fn get_definition(&self, word: &str) -> Option<WordDefinition> {
        let key = normalize_word(word);
        if key.is_empty() {
            return None;
        }
        if let Some(definition) = self.lookup(&key) {
            return Some(definition);
        }
        if let Some(analyzer) = &self.inner.analyzer
            && analyzer.is_target_script(&key)
        {
            self.spawn_resolution(key);
        }
        None
    }

    fn spawn_resolution(&self, key: String) {
        let Ok(runtime) = Handle::try_current() else {
            debug!("No runtime to resolve '{key}' in the background");
            return;
        };
        if !self.inner.in_flight.lock().insert(key.clone()) {
            return;
        }

        let store = self.clone();
        runtime.spawn(async move {
            store.resolve_definition(&key).await;
            store.inner.in_flight.lock().remove(&key);
        });
    }

    /// Whether a background resolution is running for `word`.
    pub fn is_resolving(&self, word: &str) -> bool {
        self.inner.in_flight.lock().contains(&normalize_word(word))
    }

    /// Resolve `word` through its base forms and wait for the result.
    ///
    /// The found definition is cached under the surface unless the store
    /// changed while the analyzer was running.
    pub async fn resolve_definition(&self, word: &str) -> Option<WordDefinition> {
        let key = normalize_word(word);
        if key.is_empty() {
            return None;
        }
        if let Some(definition) = self.lookup(&key) {
            return Some(definition);
        }

        let analyzer = self.inner.analyzer.as_ref()?;
        if !analyzer.is_target_script(&key) {
            return None;
        }

        let epoch = self.inner.epoch.load(Ordering::Acquire);
        let mut visited = HashSet::new();
        let mut current = key.clone();
        while visited.insert(current.clone()) {
            let result = analyzer.analyze_word(&current).await?;
            let base = normalize_word(&result.base_form);
            if base.is_empty() {
                return None;
            }

            if let Some(definition) = self.snapshot().get(&base).cloned() {
                let mut inflections = self.inner.inflections.write();
                if self.inner.epoch.load(Ordering::Acquire) == epoch {
                    inflections.insert(key.clone(), definition.clone());
                }
                debug!("Resolved '{key}' to '{}'", definition.word);
                return Some(definition);
            }
            current = base;
        }
        None
    }

    // ---- mutation ----------------------------------------------------------

    /// Replace one source's definitions with `records`; returns how many
    /// were accepted.
    pub fn load_source(&self, source_id: &str, records: Vec<WordRecord>) -> usize {
        let definitions: Vec<WordDefinition> = records
            .into_iter()
            .filter_map(|record| match record.into_definition(source_id) {
                Ok(definition) => Some(definition),
                Err(e) => {
                    warn!("Skipping record: {e}");
                    None
                }
            })
            .collect();
        let count = definitions.len();

        self.inner
            .sources
            .write()
            .insert(source_id.to_string(), definitions);
        self.invalidate();
        debug!("Loaded {count} definitions into source '{source_id}'");
        count
    }

    /// Load every source from `source`.
    pub async fn load_from(&self, source: &dyn VocabularySource) -> Result<usize> {
        let sources = source.load().await?;
        let mut total = 0;
        for (source_id, records) in sources {
            total += self.load_source(&source_id, records);
        }
        info!("Loaded {total} definitions from the {} source", source.name());
        Ok(total)
    }

    /// Load every source from the configured source.
    pub async fn load(&self) -> Result<usize> {
        let Some(source) = self.inner.source.clone() else {
            return Err(GlossaError::vocabulary("no vocabulary source configured"));
        };
        self.load_from(source.as_ref()).await
    }

    /// Add a definition to its source.
    pub fn add_word(&self, definition: WordDefinition) -> Result<WordDefinition> {
        if definition.key().is_empty() {
            return Err(GlossaError::invalid_argument("word must not be empty"));
        }
        if definition.source_id.is_empty() {
            return Err(GlossaError::invalid_argument("source id must not be empty"));
        }

        {
            let mut sources = self.inner.sources.write();
            let entries = sources.entry(definition.source_id.clone()).or_default();
            match entries
                .iter_mut()
                .find(|entry| entry.node_id == definition.node_id)
            {
                Some(existing) => *existing = definition.clone(),
                None => entries.push(definition.clone()),
            }
        }
        self.invalidate();
        self.queue_write(&definition.source_id, WriteOp::Create(definition.to_record()));
        Ok(definition)
    }

    /// Replace the definition with the same source and node id.
    pub fn update_word(&self, definition: WordDefinition) -> Result<WordDefinition> {
        if definition.key().is_empty() {
            return Err(GlossaError::invalid_argument("word must not be empty"));
        }

        {
            let mut sources = self.inner.sources.write();
            let existing = sources
                .get_mut(&definition.source_id)
                .and_then(|entries| {
                    entries
                        .iter_mut()
                        .find(|entry| entry.node_id == definition.node_id)
                })
                .ok_or_else(|| {
                    GlossaError::not_found(format!(
                        "node '{}' in source '{}'",
                        definition.node_id, definition.source_id
                    ))
                })?;
            *existing = definition.clone();
        }
        self.invalidate();
        self.queue_write(&definition.source_id, WriteOp::Update(definition.to_record()));
        Ok(definition)
    }

    /// Remove a definition from its source.
    pub fn delete_word(&self, source_id: &str, node_id: &str) -> Result<WordDefinition> {
        let removed = {
            let mut sources = self.inner.sources.write();
            let entries = sources
                .get_mut(source_id)
                .ok_or_else(|| GlossaError::not_found(format!("source '{source_id}'")))?;
            let at = entries
                .iter()
                .position(|entry| entry.node_id == node_id)
                .ok_or_else(|| {
                    GlossaError::not_found(format!("node '{node_id}' in source '{source_id}'"))
                })?;
            entries.remove(at)
        };
        self.invalidate();
        self.queue_write(
            source_id,
            WriteOp::Delete {
                node_id: node_id.to_string(),
            },
        );
        Ok(removed)
    }

    /// Set the mastered flag of the definition `word` currently resolves to.
    pub fn set_mastered(&self, word: &str, mastered: bool) -> Result<WordDefinition> {
        let key = normalize_word(word);
        let current = self
            .snapshot()
            .get(&key)
            .cloned()
            .ok_or_else(|| GlossaError::not_found(format!("word '{word}'")))?;
        self.update_word(current.with_mastered(mastered))
    }

    pub fn mastery_detection(&self) -> MasteryDetection {
        *self.inner.mastery.read()
    }

    pub fn set_mastery_detection(&self, mode: MasteryDetection) {
        *self.inner.mastery.write() = mode;
        self.invalidate();
    }

    // ---- write-back --------------------------------------------------------

    fn debouncer(&self, source_id: &str) -> Arc<Debouncer> {
        let mut debouncers = self.inner.debouncers.lock();
        Arc::clone(debouncers.entry(source_id.to_string()).or_insert_with(|| {
            Arc::new(Debouncer::new("write_back", self.inner.write_back_delay))
        }))
    }

    fn queue_write(&self, source_id: &str, op: WriteOp) {
        if self.inner.source.is_none() {
            return;
        }
        coalesce(
            self.inner
                .pending
                .lock()
                .entry(source_id.to_string())
                .or_default(),
            op,
        );

        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        let source_id = source_id.to_string();
        self.debouncer(&source_id).trigger(move || async move {
            if let Some(inner) = weak.upgrade() {
                VocabularyStore { inner }.flush_source(&source_id).await;
            }
        });
    }

    /// Number of queued, unwritten changes.
    pub fn pending_writes(&self) -> usize {
        self.inner.pending.lock().values().map(Vec::len).sum()
    }

    async fn flush_source(&self, source_id: &str) {
        let _writing = self.inner.write_lock.lock().await;
        let ops = self.inner.pending.lock().remove(source_id);
        let (Some(ops), Some(source)) = (ops, self.inner.source.as_ref()) else {
            return;
        };
        if ops.is_empty() {
            return;
        }

        let count = ops.len();
        match source.apply(source_id, ops).await {
            Ok(()) => debug!("Wrote {count} changes back to source '{source_id}'"),
            Err(e) => error!("Write-back of {count} changes to source '{source_id}' failed: {e}"),
        }
    }

    /// Write every queued change now and wait for writes in progress.
    pub async fn flush_pending(&self) {
        let debouncers: Vec<Arc<Debouncer>> =
            self.inner.debouncers.lock().values().cloned().collect();
        for debouncer in debouncers {
            debouncer.cancel();
        }

        let source_ids: Vec<String> = self.inner.pending.lock().keys().cloned().collect();
        for source_id in source_ids {
            self.flush_source(&source_id).await;
        }
        // Waits for a timer-started write that was already running.
        drop(self.inner.write_lock.lock().await);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;
    use crate::vocabulary::source::MemorySource;

    fn record(node_id: &str, word: &str, mastered: bool) -> WordRecord {
        WordRecord {
            node_id: node_id.to_string(),
            word: word.to_string(),
            definition: format!("definition of {word}"),
            etymology: None,
            color: None,
            mastered,
        }
    }

    fn store_with(source: Arc<MemorySource>) -> VocabularyStore {
        let analyzer = Arc::new(MorphologyAnalyzer::rule_based(AnalyzerConfig::default()));
        VocabularyStore::builder(VocabularyConfig::default().with_write_back_delay_ms(50))
            .source(source)
            .analyzer(analyzer)
            .build()
    }

    #[test]
    fn test_coalesce() {
        let mut ops = Vec::new();
        coalesce(&mut ops, WriteOp::Create(record("1", "a", false)));
        coalesce(&mut ops, WriteOp::Update(record("1", "b", false)));
        assert_eq!(ops, vec![WriteOp::Create(record("1", "b", false))]);

        coalesce(
            &mut ops,
            WriteOp::Delete {
                node_id: "1".to_string(),
            },
        );
        assert!(ops.is_empty());

        coalesce(&mut ops, WriteOp::Update(record("2", "c", false)));
        coalesce(
            &mut ops,
            WriteOp::Delete {
                node_id: "2".to_string(),
            },
        );
        assert_eq!(
            ops,
            vec![WriteOp::Delete {
                node_id: "2".to_string()
            }]
        );
    }

    #[test]
    fn test_exact_lookup_is_case_insensitive() {
        let store = VocabularyStore::new(VocabularyConfig::default());
        store.load_source("en", vec![record("1", "Serendipity", false)]);
        let definition = store.get_definition("  SERENDIPITY ").unwrap();
        assert_eq!(definition.word, "Serendipity");
        assert!(store.get_definition("").is_none());
    }

    #[test]
    fn test_mutation_invalidates_snapshot() {
        let store = VocabularyStore::new(VocabularyConfig::default());
        store.load_source("en", vec![record("1", "alpha", false)]);
        let before = store.snapshot();
        assert!(store.is_cache_valid());

        store
            .add_word(WordDefinition::new("beta", "second", "en"))
            .unwrap();
        assert!(!store.is_cache_valid());
        let after = store.snapshot();
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        assert!(after.is_consistent());
    }

    #[test]
    fn test_mastery() {
        let store = VocabularyStore::new(VocabularyConfig::default());
        store.load_source(
            "en",
            vec![record("1", "alpha", false), record("2", "beta", true)],
        );
        assert_eq!(store.unmastered_words(), vec!["alpha".to_string()]);

        store.set_mastered("alpha", true).unwrap();
        assert!(store.unmastered_words().is_empty());

        store.set_mastery_detection(MasteryDetection::Disabled);
        assert_eq!(store.unmastered_words().len(), 2);
        assert!(store.set_mastered("gamma", true).is_err());
    }

    #[test]
    fn test_invalid_records_are_skipped() {
        let store = VocabularyStore::new(VocabularyConfig::default());
        let accepted = store.load_source("en", vec![record("1", "", false), record("2", "ok", false)]);
        assert_eq!(accepted, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_inflected_word() {
        let store = store_with(Arc::new(MemorySource::new()));
        store.load_source("ko", vec![record("1", "공부하다", false)]);

        let definition = store.resolve_definition("공부했습니다").await.unwrap();
        assert_eq!(definition.word, "공부하다");
        // Cached by surface now.
        assert_eq!(store.get_definition("공부했습니다").unwrap().word, "공부하다");

        store.load_source("ko", vec![record("1", "공부하다", false)]);
        assert!(store.inner.inflections.read().is_empty());
    }

    #[tokio::test]
    async fn test_get_definition_resolves_in_background() {
        let store = store_with(Arc::new(MemorySource::new()));
        store.load_source("ko", vec![record("1", "먹다", false)]);

        assert!(store.get_definition("먹었어요").is_none());
        for _ in 0..100 {
            if !store.is_resolving("먹었어요") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(store.get_definition("먹었어요").unwrap().word, "먹다");
    }

    #[tokio::test]
    async fn test_unknown_word_is_not_resolved() {
        let store = store_with(Arc::new(MemorySource::new()));
        store.load_source("ko", vec![record("1", "먹다", false)]);
        assert!(store.resolve_definition("공부했다").await.is_none());
        assert!(store.resolve_definition("unknown").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_are_written_back_in_one_batch() {
        let source = Arc::new(MemorySource::new());
        let store = store_with(Arc::clone(&source));

        let added = store
            .add_word(WordDefinition::new("alpha", "first", "en"))
            .unwrap();
        store
            .update_word(WordDefinition {
                definition: "first letter".to_string(),
                ..added.clone()
            })
            .unwrap();
        store
            .add_word(WordDefinition::new("beta", "second", "en"))
            .unwrap();
        assert_eq!(store.pending_writes(), 2);
        assert!(source.batches().is_empty());

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        store.flush_pending().await;

        let batches = source.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].1.len(), 2);
        assert_eq!(source.records("en")[0].definition, "first letter");
        assert_eq!(store.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_flush_pending_writes_immediately() {
        let source = Arc::new(MemorySource::new());
        let store = store_with(Arc::clone(&source));
        let added = store
            .add_word(WordDefinition::new("alpha", "first", "en"))
            .unwrap();
        store.delete_word("en", &added.node_id).unwrap();
        store
            .add_word(WordDefinition::new("beta", "second", "en"))
            .unwrap();

        store.flush_pending().await;
        let records = source.records("en");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].word, "beta");
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_state() {
        let source = Arc::new(MemorySource::new());
        source.set_failing(true);
        let store = store_with(Arc::clone(&source));
        store
            .add_word(WordDefinition::new("alpha", "first", "en"))
            .unwrap();
        store.flush_pending().await;

        assert!(store.get_definition("alpha").is_some());
        assert!(source.records("en").is_empty());
        assert_eq!(store.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_load_from_source() {
        let source = Arc::new(
            MemorySource::new()
                .with_source("en", vec![record("1", "alpha", false)])
                .with_source("ko", vec![record("2", "공부하다", false)]),
        );
        let store = store_with(Arc::clone(&source));
        assert_eq!(store.load().await.unwrap(), 2);
        assert_eq!(store.source_ids(), vec!["en".to_string(), "ko".to_string()]);
        assert!(store.snapshot().is_consistent());
    }
}
