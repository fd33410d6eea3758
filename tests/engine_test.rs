use std::sync::Arc;
use std::time::Duration;

use glossa::config::{GlossaConfig, IndexConfig, MatcherConfig};
use glossa::engine::Engine;
use glossa::index::{DocumentEvent, IndexOutcome};
use glossa::matcher::MatcherRegistry;
use glossa::vocabulary::{MemorySource, WordDefinition, WordRecord};

fn record(node_id: &str, word: &str, definition: &str) -> WordRecord {
    WordRecord {
        node_id: node_id.to_string(),
        word: word.to_string(),
        definition: definition.to_string(),
        etymology: None,
        color: None,
        mastered: false,
    }
}

fn config() -> GlossaConfig {
    GlossaConfig::default().with_matcher(MatcherConfig::default().with_refresh_delay_ms(10))
}

async fn engine_with_vocabulary() -> Engine {
    let source = MemorySource::new()
        .with_source(
            "korean",
            vec![
                record("k1", "공부하다", "to study"),
                record("k2", "먹다", "to eat"),
            ],
        )
        .with_source("english", vec![record("e1", "study", "to learn")]);
    let engine = Engine::builder(config()).source(Arc::new(source)).build();
    assert_eq!(engine.load_sources().await.unwrap(), 3);
    engine
}

#[tokio::test]
async fn test_inflections_resolve_to_one_entry() {
    let engine = engine_with_vocabulary().await;
    engine
        .index_document("2024-03-01.md", 1, "도서관에서 공부했다. 밥을 먹었어요.")
        .await;
    engine
        .index_document("2024-03-02.md", 1, "매일 공부합니다.")
        .await;
    engine.refresh().await;

    let text = "공부하다, 공부했다, 공부합니다. I study.";
    let matches = engine.scan(text);
    let found: Vec<(&str, &str)> = matches
        .iter()
        .map(|m| (&text[m.start..m.end], m.payload.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("공부하다", "공부하다"),
            ("공부했다", "공부하다"),
            ("공부합니다", "공부하다"),
            ("study", "study"),
        ]
    );

    for m in &matches {
        let definition = engine.get_definition(&m.payload).unwrap();
        assert_eq!(definition.word, m.payload);
    }
    assert_eq!(
        engine.get_all_inflections("공부하다").len(),
        2,
        "공부했다 and 공부합니다"
    );
}

#[tokio::test]
async fn test_unseen_inflection_is_not_matched() {
    let engine = engine_with_vocabulary().await;
    engine.refresh().await;
    assert!(engine.scan("먹었어요").is_empty());

    engine.index_document("a.md", 1, "먹었어요").await;
    engine.refresh().await;
    assert_eq!(engine.scan("먹었어요")[0].payload, "먹다");
}

#[tokio::test(start_paused = true)]
async fn test_document_changes_refresh_shared_registry() {
    let registry = Arc::new(MatcherRegistry::new());
    let reader = registry.register();
    let engine = Engine::builder(config()).registry(Arc::clone(&registry)).build();
    engine
        .add_word(WordDefinition::new("먹다", "to eat", "korean"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(reader.find_all_matches("먹었다").is_empty());

    let event = DocumentEvent::Modified {
        id: "a.md".to_string(),
        stamp: 1,
        content: "먹었다".to_string(),
    };
    assert_eq!(engine.handle_document_event(&event).await, IndexOutcome::Indexed);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(reader.find_all_matches("또 먹었다").len(), 1);

    let deleted = DocumentEvent::Deleted {
        id: "a.md".to_string(),
    };
    assert_eq!(engine.handle_document_event(&deleted).await, IndexOutcome::Removed);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(reader.find_all_matches("먹었다").is_empty());
    assert_eq!(reader.find_all_matches("먹다").len(), 1);
}

#[tokio::test]
async fn test_mastered_words_leave_the_matcher() {
    let engine = engine_with_vocabulary().await;
    assert_eq!(engine.scan("study").len(), 1);

    engine.set_mastered("study", true).unwrap();
    engine.refresh().await;
    assert!(engine.scan("study").is_empty());
    assert!(engine.get_definition("study").is_some());
    engine.shutdown().await;
}

#[tokio::test]
async fn test_disabled_index_matches_base_forms_only() {
    let config = config().with_index(IndexConfig { enabled: false });
    let engine = Engine::new(config);
    engine
        .add_word(WordDefinition::new("먹다", "to eat", "korean"))
        .unwrap();
    assert_eq!(
        engine.index_document("a.md", 1, "먹었다").await,
        IndexOutcome::Disabled
    );
    engine.refresh().await;
    assert!(engine.scan("먹었다").is_empty());
    assert_eq!(engine.scan("먹다").len(), 1);
}
