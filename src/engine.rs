//! High-level engine that ties the vocabulary, the morphology index and the
//! live matcher together.
//!
//! ```text
//! VocabularyStore ── words ──┐
//!                            ├──→ PrefixMatcher ──publish──→ MatcherRegistry ──→ slots
//! MorphologyIndex ── inflections ┘
//!        ↑
//! DocumentEvent
//! ```
//!
//! # Examples
//!
//! ```
//! use glossa::config::GlossaConfig;
//! use glossa::engine::Engine;
//! use glossa::vocabulary::WordDefinition;
//!
//! # tokio_test::block_on(async {
//! let engine = Engine::new(GlossaConfig::default());
//! engine.add_word(WordDefinition::new("공부하다", "to study", "korean")).unwrap();
//! engine.index_document("diary.md", 1, "오늘 도서관에서 공부했다").await;
//! engine.refresh().await;
//!
//! let matches = engine.scan("어제도 공부했다");
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].payload, "공부하다");
//! # engine.shutdown().await;
//! # });
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, info};

use crate::analysis::analyzer::MorphologyAnalyzer;
use crate::analysis::backend::BackendLoader;
use crate::config::GlossaConfig;
use crate::error::Result;
use crate::index::document::{DocumentEvent, IndexOutcome};
use crate::index::morphology::MorphologyIndex;
use crate::matcher::overlap::resolve_overlaps;
use crate::matcher::registry::{MatcherGeneration, MatcherRegistry, MatcherSlot};
use crate::matcher::trie::{Match, PrefixMatcher};
use crate::scheduler::{Debouncer, RebuildGate};
use crate::vocabulary::definition::{WordDefinition, normalize_word};
use crate::vocabulary::source::VocabularySource;
use crate::vocabulary::store::VocabularyStore;

struct EngineInner {
    config: GlossaConfig,
    analyzer: Arc<MorphologyAnalyzer>,
    index: Arc<MorphologyIndex>,
    store: VocabularyStore,
    registry: Arc<MatcherRegistry>,
    gate: RebuildGate,
    refresh_timer: Debouncer,
}

/// Vocabulary matching engine.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("analyzer", &self.inner.analyzer)
            .field("store", &self.inner.store)
            .field("generation", &self.inner.registry.generation())
            .finish()
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    config: GlossaConfig,
    loader: Option<Arc<dyn BackendLoader>>,
    source: Option<Arc<dyn VocabularySource>>,
    registry: Option<Arc<MatcherRegistry>>,
}

impl EngineBuilder {
    /// Morphological backend, loaded on first analysis.
    pub fn backend_loader(mut self, loader: Arc<dyn BackendLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Where vocabulary is loaded from and written back to.
    pub fn source(mut self, source: Arc<dyn VocabularySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Publish matchers into an existing registry.
    pub fn registry(mut self, registry: Arc<MatcherRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Engine {
        let config = self.config;
        let analyzer = Arc::new(MorphologyAnalyzer::new(config.analyzer.clone(), self.loader));
        let index = Arc::new(MorphologyIndex::new(Arc::clone(&analyzer), &config.index));

        let mut store = VocabularyStore::builder(config.vocabulary.clone())
            .analyzer(Arc::clone(&analyzer));
        if let Some(source) = self.source {
            store = store.source(source);
        }

        Engine {
            inner: Arc::new(EngineInner {
                refresh_timer: Debouncer::new("matcher_refresh", config.matcher.refresh_delay()),
                gate: RebuildGate::new(),
                registry: self.registry.unwrap_or_default(),
                store: store.build(),
                index,
                analyzer,
                config,
            }),
        }
    }
}

impl Engine {
    pub fn builder(config: GlossaConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            loader: None,
            source: None,
            registry: None,
        }
    }

    /// Engine with the rule-based analyzer and an in-memory vocabulary.
    pub fn new(config: GlossaConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &GlossaConfig {
        &self.inner.config
    }

    pub fn analyzer(&self) -> &Arc<MorphologyAnalyzer> {
        &self.inner.analyzer
    }

    pub fn index(&self) -> &Arc<MorphologyIndex> {
        &self.inner.index
    }

    pub fn store(&self) -> &VocabularyStore {
        &self.inner.store
    }

    pub fn registry(&self) -> &Arc<MatcherRegistry> {
        &self.inner.registry
    }

    /// A live view of the published matcher.
    pub fn register(&self) -> Arc<MatcherSlot> {
        self.inner.registry.register()
    }

    // ---- matcher -----------------------------------------------------------

    /// Matcher over `words` and every known inflection of them; each pattern
    /// carries its canonical word as payload.
    pub fn rebuild_matcher(&self, words: &[String]) -> PrefixMatcher<String> {
        let mut matcher = PrefixMatcher::new();
        for word in words {
            matcher.add_word(word, word.clone());

            let mut inflections = self.inner.index.global_inflections(word);
            let key = normalize_word(word);
            if key != *word {
                inflections.extend(self.inner.index.global_inflections(&key));
            }
            for inflection in inflections {
                if !matcher.contains(&inflection) {
                    matcher.add_word(&inflection, word.clone());
                }
            }
        }
        matcher
    }

    fn publish_matcher(&self) -> MatcherGeneration {
        let words = self.inner.store.unmastered_words();
        let matcher = self.rebuild_matcher(&words);
        let patterns = matcher.len();
        let generation = self.inner.registry.publish(matcher);
        debug!(
            "Matcher generation {generation}: {} words, {patterns} patterns",
            words.len()
        );
        generation
    }

    /// Rebuild the matcher from the unmastered words and publish it.
    ///
    /// A refresh requested while one is running makes the running one go
    /// around once more; returns whether this call did the rebuilding.
    pub async fn refresh(&self) -> bool {
        let engine = self;
        self.inner
            .gate
            .run(move || {
                engine.publish_matcher();
                std::future::ready(())
            })
            .await
    }

    /// Refresh after the configured quiet period.
    pub fn schedule_refresh(&self) -> bool {
        let weak = Arc::downgrade(&self.inner);
        self.inner.refresh_timer.trigger(move || async move {
            if let Some(inner) = weak.upgrade() {
                Engine { inner }.refresh().await;
            }
        })
    }

    /// Every longest match per start position in `text`.
    pub fn find_all_matches(&self, text: &str) -> Vec<Match<String>> {
        self.inner.registry.current().find_all_matches(text)
    }

    /// Non-overlapping matches in `text`, in text order.
    pub fn scan(&self, text: &str) -> Vec<Match<String>> {
        resolve_overlaps(self.find_all_matches(text))
    }

    // ---- lookups -----------------------------------------------------------

    /// See [`VocabularyStore::get_definition`].
    pub fn get_definition(&self, word: &str) -> Option<WordDefinition> {
        self.inner.store.get_definition(word)
    }

    /// See [`VocabularyStore::resolve_definition`].
    pub async fn resolve_definition(&self, word: &str) -> Option<WordDefinition> {
        self.inner.store.resolve_definition(word).await
    }

    /// Every surface of `base` seen in the indexed documents.
    pub fn get_all_inflections(&self, base: &str) -> BTreeSet<String> {
        self.inner.index.global_inflections(base)
    }

    // ---- documents ---------------------------------------------------------

    pub async fn index_document(&self, id: &str, stamp: u64, content: &str) -> IndexOutcome {
        self.inner.index.index_document(id, stamp, content).await
    }

    /// Apply a document change and schedule a refresh when the index changed.
    pub async fn handle_document_event(&self, event: &DocumentEvent) -> IndexOutcome {
        let outcome = self.inner.index.handle_event(event).await;
        if matches!(outcome, IndexOutcome::Indexed | IndexOutcome::Removed) {
            self.schedule_refresh();
        }
        outcome
    }

    // ---- vocabulary --------------------------------------------------------

    /// Load the configured vocabulary source and publish a matcher.
    pub async fn load_sources(&self) -> Result<usize> {
        let loaded = self.inner.store.load().await?;
        self.refresh().await;
        info!("Engine ready with {loaded} definitions");
        Ok(loaded)
    }

    pub fn add_word(&self, definition: WordDefinition) -> Result<WordDefinition> {
        let added = self.inner.store.add_word(definition)?;
        self.schedule_refresh();
        Ok(added)
    }

    pub fn update_word(&self, definition: WordDefinition) -> Result<WordDefinition> {
        let updated = self.inner.store.update_word(definition)?;
        self.schedule_refresh();
        Ok(updated)
    }

    pub fn delete_word(&self, source_id: &str, node_id: &str) -> Result<WordDefinition> {
        let removed = self.inner.store.delete_word(source_id, node_id)?;
        self.schedule_refresh();
        Ok(removed)
    }

    pub fn set_mastered(&self, word: &str, mastered: bool) -> Result<WordDefinition> {
        let updated = self.inner.store.set_mastered(word, mastered)?;
        self.schedule_refresh();
        Ok(updated)
    }

    /// Write back pending edits and release the analyzer backend.
    pub async fn shutdown(&self) {
        self.inner.refresh_timer.cancel();
        self.inner.store.flush_pending().await;
        self.inner.analyzer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatcherConfig;
    use std::time::Duration;

    fn engine() -> Engine {
        Engine::new(
            GlossaConfig::default().with_matcher(MatcherConfig::default().with_refresh_delay_ms(20)),
        )
    }

    #[tokio::test]
    async fn test_plain_words_match() {
        let engine = engine();
        engine
            .add_word(WordDefinition::new("serendipity", "luck", "en"))
            .unwrap();
        engine.refresh().await;

        let matches = engine.scan("What serendipity! Serendipity.");
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.payload == "serendipity"));
    }

    #[tokio::test]
    async fn test_inflections_map_to_canonical_word() {
        let engine = engine();
        engine
            .add_word(WordDefinition::new("공부하다", "to study", "ko"))
            .unwrap();
        engine.index_document("a.md", 1, "공부했다 그리고 공부합니다").await;
        engine.refresh().await;

        let matcher = engine.registry().current();
        assert!(matcher.contains("공부했다"));
        assert!(matcher.contains("공부합니다"));
        assert!(engine.get_all_inflections("공부하다").contains("공부합니다"));

        let matches = engine.scan("나는 공부합니다");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].payload, "공부하다");
        assert_eq!(matches[0].word, "공부합니다");
    }

    #[tokio::test]
    async fn test_mastered_words_are_not_matched() {
        let engine = engine();
        engine
            .add_word(WordDefinition::new("alpha", "first", "en"))
            .unwrap();
        engine.set_mastered("alpha", true).unwrap();
        engine.refresh().await;
        assert!(engine.scan("alpha").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_event_schedules_refresh() {
        let engine = engine();
        let slot = engine.register();
        engine
            .add_word(WordDefinition::new("먹다", "to eat", "ko"))
            .unwrap();
        let outcome = engine
            .handle_document_event(&DocumentEvent::Modified {
                id: "a.md".to_string(),
                stamp: 1,
                content: "밥을 먹었다".to_string(),
            })
            .await;
        assert_eq!(outcome, IndexOutcome::Indexed);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(slot.generation() >= 1);
        assert_eq!(slot.find_all_matches("또 먹었다").len(), 1);
    }

    #[tokio::test]
    async fn test_definition_of_match_payload() {
        let engine = engine();
        engine
            .add_word(WordDefinition::new("공부하다", "to study", "ko"))
            .unwrap();
        let definition = engine.resolve_definition("공부했어요").await.unwrap();
        assert_eq!(definition.definition, "to study");
        assert_eq!(engine.get_definition("공부했어요").unwrap().word, "공부하다");
    }
}
