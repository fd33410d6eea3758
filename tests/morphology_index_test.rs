use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use glossa::analysis::{MorphemeBackend, MorphologyAnalyzer, RawToken};
use glossa::config::{AnalyzerConfig, IndexConfig};
use glossa::error::{GlossaError, Result};
use glossa::index::{DocumentEvent, DocumentStatus, IndexOutcome, MorphologyIndex};

/// Backend answering from a fixed table and counting tokenize calls.
struct CountingBackend {
    answers: HashMap<String, Vec<RawToken>>,
    calls: AtomicUsize,
}

#[async_trait]
impl MorphemeBackend for CountingBackend {
    async fn tokenize(&self, text: &str) -> Result<Vec<RawToken>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .get(text)
            .cloned()
            .ok_or_else(|| GlossaError::backend(format!("cannot tokenize '{text}'")))
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

fn token(form: &str, tag: &str, start: usize) -> RawToken {
    RawToken::Morpheme {
        form: form.to_string(),
        tag: tag.to_string(),
        lemma: None,
        span: Some((start, start + form.len())),
    }
}

/// 먹었다: 먹/VV 었/EP 다/EF
fn ate(offset: usize) -> Vec<RawToken> {
    vec![
        token("먹", "VV", offset),
        token("었", "EP", offset + 3),
        token("다", "EF", offset + 6),
    ]
}

/// 먹었어요: 먹/VV 었/EP 어요/EF
fn ate_polite(offset: usize) -> Vec<RawToken> {
    vec![
        token("먹", "VV", offset),
        token("었", "EP", offset + 3),
        token("어요", "EF", offset + 6),
    ]
}

fn fixture() -> (Arc<CountingBackend>, MorphologyIndex) {
    let mut answers = HashMap::new();
    answers.insert("먹었다".to_string(), ate(0));
    let mut both = ate(0);
    both.extend(ate_polite(10));
    answers.insert("먹었다 먹었어요".to_string(), both);

    let backend = Arc::new(CountingBackend {
        answers,
        calls: AtomicUsize::new(0),
    });
    let analyzer = MorphologyAnalyzer::with_backend(AnalyzerConfig::default(), backend.clone());
    let index = MorphologyIndex::new(Arc::new(analyzer), &IndexConfig::default());
    (backend, index)
}

/// Backend that takes `delay` to tokenize 먹었다 and answers 읽었다 at once.
struct SlowBackend {
    delay: Duration,
}

#[async_trait]
impl MorphemeBackend for SlowBackend {
    async fn tokenize(&self, text: &str) -> Result<Vec<RawToken>> {
        match text {
            "먹었다" => {
                tokio::time::sleep(self.delay).await;
                Ok(ate(0))
            }
            "읽었다" => Ok(vec![
                token("읽", "VV", 0),
                token("었", "EP", 3),
                token("다", "EF", 6),
            ]),
            _ => Err(GlossaError::backend(format!("cannot tokenize '{text}'"))),
        }
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

fn slow_index() -> Arc<MorphologyIndex> {
    let backend = Arc::new(SlowBackend {
        delay: Duration::from_millis(200),
    });
    let analyzer = MorphologyAnalyzer::with_backend(AnalyzerConfig::default(), backend);
    Arc::new(MorphologyIndex::new(Arc::new(analyzer), &IndexConfig::default()))
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_same_stamp_is_not_reanalyzed() {
    let (backend, index) = fixture();

    assert_eq!(index.index_document("a.md", 7, "먹었다").await, IndexOutcome::Indexed);
    let global = index.global_index();
    assert_eq!(index.global_inflections("먹다"), set(&["먹었다"]));

    assert_eq!(index.index_document("a.md", 7, "먹었다").await, IndexOutcome::Skipped);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(index.global_index(), global);

    assert_eq!(index.index_document("a.md", 8, "먹었다").await, IndexOutcome::Indexed);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    assert_eq!(index.global_index(), global);
}

#[tokio::test(start_paused = true)]
async fn test_newer_reindex_wins_over_slower_older_one() {
    let index = slow_index();

    let older = tokio::spawn({
        let index = Arc::clone(&index);
        async move { index.index_document("a.md", 1, "먹었다").await }
    });
    // Let the older call start analyzing before the newer one arrives.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let newer = index.index_document("a.md", 2, "읽었다").await;
    assert_eq!(newer, IndexOutcome::Indexed);
    assert_eq!(older.await.unwrap(), IndexOutcome::Skipped);

    assert_eq!(index.entry("a.md").unwrap().last_modified, 2);
    assert_eq!(index.global_inflections("읽다"), set(&["읽었다"]));
    assert!(index.global_inflections("먹다").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_removal_during_analysis_is_kept() {
    let index = slow_index();

    let pending = tokio::spawn({
        let index = Arc::clone(&index);
        async move { index.index_document("a.md", 1, "먹었다").await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let deleted = DocumentEvent::Deleted {
        id: "a.md".to_string(),
    };
    assert_eq!(index.handle_event(&deleted).await, IndexOutcome::Skipped);
    assert_eq!(pending.await.unwrap(), IndexOutcome::Skipped);

    assert!(index.entry("a.md").is_none());
    assert!(index.global_index().is_empty());
}

#[tokio::test]
async fn test_removal_keeps_shared_surfaces() {
    let (_, index) = fixture();
    index.index_document("a.md", 1, "먹었다").await;
    index.index_document("b.md", 1, "먹었다 먹었어요").await;
    assert_eq!(index.global_inflections("먹다"), set(&["먹었다", "먹었어요"]));
    assert_eq!(index.document_inflections("먹다", "a.md"), set(&["먹었다"]));

    assert!(index.remove_document("b.md"));
    assert_eq!(index.global_inflections("먹다"), set(&["먹었다"]));

    assert!(index.remove_document("a.md"));
    assert!(index.global_inflections("먹다").is_empty());
    assert!(index.global_index().is_empty());
    assert!(!index.remove_document("a.md"));
}

#[tokio::test]
async fn test_failed_analysis_keeps_previous_entry() {
    let (_, index) = fixture();
    index.index_document("a.md", 1, "먹었다").await;

    let outcome = index.index_document("a.md", 2, "알 수 없는 글").await;
    assert_eq!(outcome, IndexOutcome::Failed);
    assert_eq!(index.entry("a.md").unwrap().last_modified, 1);
    assert_eq!(index.global_inflections("먹다"), set(&["먹었다"]));
}

#[tokio::test]
async fn test_document_events() {
    let (backend, index) = fixture();

    let modified = DocumentEvent::Modified {
        id: "a.md".to_string(),
        stamp: 1,
        content: "먹었다".to_string(),
    };
    assert_eq!(index.handle_event(&modified).await, IndexOutcome::Indexed);
    assert_eq!(index.status("a.md"), DocumentStatus::Indexed);

    assert_eq!(index.mark_modified("a.md", 2), DocumentStatus::Stale);

    let renamed = DocumentEvent::Renamed {
        old_id: "a.md".to_string(),
        new_id: "meals/a.md".to_string(),
        stamp: 1,
        content: "먹었다".to_string(),
    };
    assert_eq!(index.handle_event(&renamed).await, IndexOutcome::Indexed);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert!(index.entry("a.md").is_none());
    assert_eq!(index.document_inflections("먹다", "meals/a.md"), set(&["먹었다"]));

    let deleted = DocumentEvent::Deleted {
        id: "meals/a.md".to_string(),
    };
    assert_eq!(index.handle_event(&deleted).await, IndexOutcome::Removed);
    assert_eq!(index.status("meals/a.md"), DocumentStatus::Removed);
    assert!(index.global_inflections("먹다").is_empty());
}

#[tokio::test]
async fn test_disabled_index() {
    let (backend, index) = fixture();
    index.index_document("a.md", 1, "먹었다").await;

    index.set_enabled(false);
    assert_eq!(index.document_count(), 0);
    assert_eq!(index.index_document("b.md", 1, "먹었다").await, IndexOutcome::Disabled);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(index.global_inflections("먹다"), set(&["먹다"]));
    assert!(index.document_inflections("먹다", "a.md").is_empty());
}

#[tokio::test]
async fn test_snapshot_restore() {
    let (_, index) = fixture();
    index.index_document("a.md", 1, "먹었다").await;
    index.index_document("b.md", 3, "먹었다 먹었어요").await;
    let bytes = index.snapshot().unwrap();

    let (backend, restored) = fixture();
    assert_eq!(restored.restore(&bytes).unwrap(), 2);
    assert_eq!(restored.global_index(), index.global_index());

    assert_eq!(
        restored.index_document("b.md", 3, "먹었다 먹었어요").await,
        IndexOutcome::Skipped
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}
