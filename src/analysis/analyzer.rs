//! Morphological analyzers.
//!
//! # Role in the engine
//!
//! ```text
//! word / document text
//!        ↓
//! MorphologyAnalyzer ── lazy, once ──→ BackendLoader
//!        ↓                                  ↓ ok          ↓ error
//!   WordAnalyzer               BackendAnalyzer     RuleBasedAnalyzer
//!        ↓
//! MorphologyAnalysisResult / DocumentAnalysis
//! ```
//!
//! [`MorphologyAnalyzer`] is what the rest of the crate talks to. On first use
//! it asks its [`BackendLoader`] for a backend, exactly once; the outcome
//! (backend-backed or rule-based) is fixed for the analyzer's lifetime, or
//! until [`MorphologyAnalyzer::destroy`] resets it.
//!
//! # Examples
//!
//! ```
//! use glossa::analysis::analyzer::MorphologyAnalyzer;
//! use glossa::config::AnalyzerConfig;
//!
//! # tokio_test::block_on(async {
//! let analyzer = MorphologyAnalyzer::rule_based(AnalyzerConfig::default());
//! let result = analyzer.analyze_word("공부했습니다").await.unwrap();
//! assert_eq!(result.base_form, "공부하다");
//! assert!(analyzer.analyze_word("studied").await.is_none());
//! # });
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::RwLock;
use tokio::sync::OnceCell;

use crate::analysis::backend::{
    BackendLoader, MorphemeBackend, StaticBackendLoader, normalize_tokens,
};
use crate::analysis::ending::EndingRules;
use crate::analysis::pattern::{CompoundMatcher, absorb_endings, merged_surface};
use crate::analysis::script::is_target_script;
use crate::analysis::segment::{ScriptKind, WordSegmenter};
use crate::analysis::token::{
    DocumentAnalysis, EMPTY_SUPPORT_VERB, INFINITIVE_MARKER, MorphToken,
    MorphologyAnalysisResult,
};
use crate::config::AnalyzerConfig;
use crate::error::Result;

/// POS tag of a rule-based result whose ending matched.
const FALLBACK_PREDICATE_TAG: &str = "VV";
/// POS tag of a rule-based result with no recognizable ending.
const FALLBACK_UNKNOWN_TAG: &str = "NA";

/// Derives base forms for words and documents.
#[async_trait]
pub trait WordAnalyzer: Send + Sync {
    /// Analyze a single word.
    async fn analyze_word(&self, word: &str) -> Result<Option<MorphologyAnalysisResult>>;

    /// Analyze a whole text into a base form → surfaces map.
    async fn analyze_document(&self, text: &str) -> Result<DocumentAnalysis>;

    /// Release backend resources.
    fn release(&self) {}

    /// Name of this analyzer (for logs).
    fn name(&self) -> &'static str;
}

/// Ending-table analyzer used without a backend.
#[derive(Debug, Clone)]
pub struct RuleBasedAnalyzer {
    endings: EndingRules,
    segmenter: WordSegmenter,
    config: AnalyzerConfig,
}

impl RuleBasedAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_endings(EndingRules::korean(), config)
    }

    pub fn with_endings(endings: EndingRules, config: AnalyzerConfig) -> Self {
        RuleBasedAnalyzer {
            endings,
            segmenter: WordSegmenter::new(),
            config,
        }
    }

    /// Strip the first fitting ending; the input itself is the base form when
    /// nothing fits.
    pub fn analyze(&self, word: &str) -> MorphologyAnalysisResult {
        let result = match self.endings.strip(word) {
            Some((base, rule)) => {
                debug!("Ending '{}' stripped from '{word}' → '{base}'", rule.ending);
                MorphologyAnalysisResult::new(
                    word,
                    base,
                    FALLBACK_PREDICATE_TAG,
                    self.config.fallback_matched_confidence,
                )
            }
            None => MorphologyAnalysisResult::new(
                word,
                word,
                FALLBACK_UNKNOWN_TAG,
                self.config.fallback_unmatched_confidence,
            ),
        };
        result.with_infinitive_marker()
    }
}

#[async_trait]
impl WordAnalyzer for RuleBasedAnalyzer {
    async fn analyze_word(&self, word: &str) -> Result<Option<MorphologyAnalysisResult>> {
        Ok(Some(self.analyze(word)))
    }

    async fn analyze_document(&self, text: &str) -> Result<DocumentAnalysis> {
        let mut analysis = DocumentAnalysis::new();
        for segment in self.segmenter.segment(text) {
            if segment.kind != ScriptKind::Hangul {
                continue;
            }
            let result = self.analyze(&segment.text);
            if result.is_predicate() {
                analysis.push(result);
            }
        }
        Ok(analysis)
    }

    fn name(&self) -> &'static str {
        "rule_based"
    }
}

/// Analyzer driven by a morphological backend.
pub struct BackendAnalyzer {
    backend: Arc<dyn MorphemeBackend>,
    compounds: CompoundMatcher,
    fallback: RuleBasedAnalyzer,
    config: AnalyzerConfig,
}

impl std::fmt::Debug for BackendAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendAnalyzer")
            .field("backend", &self.backend.name())
            .field("compounds", &self.compounds)
            .finish()
    }
}

impl BackendAnalyzer {
    pub fn new(backend: Arc<dyn MorphemeBackend>, config: AnalyzerConfig) -> Self {
        BackendAnalyzer {
            backend,
            compounds: CompoundMatcher::new(config.clone()),
            fallback: RuleBasedAnalyzer::new(config.clone()),
            config,
        }
    }

    /// Replace the compound rule set.
    pub fn with_compounds(mut self, compounds: CompoundMatcher) -> Self {
        self.compounds = compounds;
        self
    }

    async fn tokens(&self, text: &str) -> Result<Vec<MorphToken>> {
        let raw = self.backend.tokenize(text).await?;
        Ok(normalize_tokens(&raw))
    }

    /// A single predicate token together with the endings that follow it.
    fn predicate_run(
        &self,
        tokens: &[MorphToken],
        at: usize,
        text: &str,
    ) -> (MorphologyAnalysisResult, usize) {
        let token = &tokens[at];
        let end = absorb_endings(tokens, at + 1, self.config.max_ending_lookahead);
        let result = MorphologyAnalysisResult::new(
            merged_surface(&tokens[at..end], Some(text)),
            token.base.clone(),
            token.primary_tag(),
            self.config.verb_token_confidence,
        );
        (result, end)
    }

    /// Compound first, then the first real predicate, then anything usable.
    fn select(&self, tokens: &[MorphToken], word: &str) -> Option<MorphologyAnalysisResult> {
        if let Some(found) = self.compounds.first_match(tokens, Some(word)) {
            return Some(found.result);
        }

        let predicate = tokens
            .iter()
            .position(|token| token.is_predicate() && token.base != EMPTY_SUPPORT_VERB);
        if let Some(at) = predicate {
            return Some(self.predicate_run(tokens, at, word).0);
        }

        tokens
            .iter()
            .find(|token| !token.base.is_empty())
            .map(|token| {
                MorphologyAnalysisResult::new(
                    token.surface.clone(),
                    token.base.clone(),
                    token.primary_tag(),
                    self.config.first_token_confidence,
                )
            })
    }
}

#[async_trait]
impl WordAnalyzer for BackendAnalyzer {
    async fn analyze_word(&self, word: &str) -> Result<Option<MorphologyAnalysisResult>> {
        let tokens = match self.tokens(word).await {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!("Backend failed on '{word}', using ending rules: {e}");
                return Ok(Some(self.fallback.analyze(word)));
            }
        };

        let result = self
            .select(&tokens, word)
            .map(MorphologyAnalysisResult::with_infinitive_marker)
            .unwrap_or_else(|| self.fallback.analyze(word));
        Ok(Some(result))
    }

    async fn analyze_document(&self, text: &str) -> Result<DocumentAnalysis> {
        let tokens = self.tokens(text).await?;
        let mut analysis = DocumentAnalysis::new();

        let mut at = 0;
        while at < tokens.len() {
            if let Some(found) = self.compounds.match_at(&tokens, at, Some(text)) {
                analysis.push(found.result.with_infinitive_marker());
                at += found.consumed.max(1);
                continue;
            }

            let token = &tokens[at];
            if token.is_predicate() {
                let (result, end) = self.predicate_run(&tokens, at, text);
                analysis.push(result.with_infinitive_marker());
                at = end;
                continue;
            }

            if token.is_ending() || token.base.ends_with(INFINITIVE_MARKER) {
                analysis.push(MorphologyAnalysisResult::new(
                    merged_surface(&tokens[at..at + 1], Some(text)),
                    token.base.clone(),
                    token.primary_tag(),
                    self.config.first_token_confidence,
                ));
            }
            at += 1;
        }

        Ok(analysis)
    }

    fn release(&self) {
        self.backend.release();
    }

    fn name(&self) -> &'static str {
        "backend"
    }
}

/// Initialization state of the analyzer's backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendState {
    /// Nothing has been analyzed yet.
    Uninitialized,
    /// The backend loaded and is in use.
    Ready,
    /// No backend, or it failed to load; the ending rules are in use.
    Unavailable,
}

#[derive(Clone)]
struct ActiveAnalyzer {
    analyzer: Arc<dyn WordAnalyzer>,
    backed: bool,
}

/// Entry point for morphological analysis.
pub struct MorphologyAnalyzer {
    config: AnalyzerConfig,
    loader: Option<Arc<dyn BackendLoader>>,
    active: RwLock<Arc<OnceCell<ActiveAnalyzer>>>,
    fallback: RuleBasedAnalyzer,
}

impl std::fmt::Debug for MorphologyAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MorphologyAnalyzer")
            .field("config", &self.config)
            .field("has_loader", &self.loader.is_some())
            .field("state", &self.backend_state())
            .finish()
    }
}

impl MorphologyAnalyzer {
    /// Analyzer that loads its backend through `loader` on first use.
    pub fn new(config: AnalyzerConfig, loader: Option<Arc<dyn BackendLoader>>) -> Self {
        MorphologyAnalyzer {
            fallback: RuleBasedAnalyzer::new(config.clone()),
            config,
            loader,
            active: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// Analyzer without a backend.
    pub fn rule_based(config: AnalyzerConfig) -> Self {
        Self::new(config, None)
    }

    /// Analyzer over an already constructed backend.
    pub fn with_backend(config: AnalyzerConfig, backend: Arc<dyn MorphemeBackend>) -> Self {
        Self::new(config, Some(Arc::new(StaticBackendLoader::new(backend))))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Whether `text` contains target-script characters.
    pub fn is_target_script(&self, text: &str) -> bool {
        is_target_script(text)
    }

    pub fn backend_state(&self) -> BackendState {
        match self.active.read().get() {
            None => BackendState::Uninitialized,
            Some(active) if active.backed => BackendState::Ready,
            Some(_) => BackendState::Unavailable,
        }
    }

    async fn initialize(&self) -> ActiveAnalyzer {
        let rule_based = || ActiveAnalyzer {
            analyzer: Arc::new(self.fallback.clone()),
            backed: false,
        };

        let Some(loader) = &self.loader else {
            info!("No morphological backend configured, using ending rules");
            return rule_based();
        };

        match loader.load().await {
            Ok(backend) => {
                info!("Morphological backend '{}' ready", backend.name());
                ActiveAnalyzer {
                    analyzer: Arc::new(BackendAnalyzer::new(backend, self.config.clone())),
                    backed: true,
                }
            }
            Err(e) => {
                warn!("Morphological backend unavailable, using ending rules: {e}");
                rule_based()
            }
        }
    }

    async fn active(&self) -> ActiveAnalyzer {
        let cell = Arc::clone(&*self.active.read());
        cell.get_or_init(|| self.initialize()).await.clone()
    }

    /// Base form of `word`, or `None` when it is not target-script text.
    pub async fn analyze_word(&self, word: &str) -> Option<MorphologyAnalysisResult> {
        let word = word.trim();
        if !is_target_script(word) {
            return None;
        }

        let active = self.active().await;
        match active.analyzer.analyze_word(word).await {
            Ok(result) => result,
            Err(e) => {
                debug!("Analysis of '{word}' failed, using ending rules: {e}");
                Some(self.fallback.analyze(word))
            }
        }
    }

    /// Base form → surfaces map of `text`.
    pub async fn analyze_document(&self, text: &str) -> Result<DocumentAnalysis> {
        if text.trim().is_empty() {
            return Ok(DocumentAnalysis::new());
        }
        let active = self.active().await;
        active.analyzer.analyze_document(text).await
    }

    /// Release the backend and forget the initialization outcome; the next
    /// analysis loads the backend again.
    pub fn destroy(&self) {
        let previous = std::mem::replace(&mut *self.active.write(), Arc::new(OnceCell::new()));
        if let Some(active) = previous.get() {
            debug!("Releasing analyzer '{}'", active.analyzer.name());
            active.analyzer.release();
        }
    }
}

impl Drop for MorphologyAnalyzer {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().get() {
            active.analyzer.release();
        }
    }
}
