//! Immutable lookup snapshot over all vocabulary sources.

use std::collections::BTreeMap;

use ahash::AHashMap;
use log::warn;

use crate::config::MasteryDetection;
use crate::vocabulary::definition::{WordDefinition, normalize_word};

/// Derived lookup tables, built in one pass and never modified afterwards.
#[derive(Clone, Debug, Default)]
pub struct VocabularyCache {
    definitions: AHashMap<String, WordDefinition>,
    all_words: Vec<String>,
    unmastered: Vec<String>,
    by_source: BTreeMap<String, Vec<String>>,
}

impl VocabularyCache {
    /// Build the tables from every source's definitions.
    ///
    /// Sources are visited in id order and definitions in source order; when
    /// a word appears more than once the last definition wins.
    pub fn build(
        sources: &BTreeMap<String, Vec<WordDefinition>>,
        mastery: MasteryDetection,
    ) -> Self {
        let mut definitions: AHashMap<String, WordDefinition> = AHashMap::new();
        let mut by_source: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (source_id, entries) in sources {
            let words = by_source.entry(source_id.clone()).or_default();
            for definition in entries {
                let key = definition.key();
                if key.is_empty() {
                    warn!(
                        "Skipping definition '{}' without a word in source '{source_id}'",
                        definition.node_id
                    );
                    continue;
                }
                words.push(definition.word.clone());
                definitions.insert(key, definition.clone());
            }
        }

        let mut keys: Vec<&String> = definitions.keys().collect();
        keys.sort();
        let all_words: Vec<String> = keys
            .iter()
            .map(|key| definitions[*key].word.clone())
            .collect();
        let unmastered = keys
            .iter()
            .map(|key| &definitions[*key])
            .filter(|definition| match mastery {
                MasteryDetection::Flag => !definition.mastered,
                MasteryDetection::Disabled => true,
            })
            .map(|definition| definition.word.clone())
            .collect();

        VocabularyCache {
            definitions,
            all_words,
            unmastered,
            by_source,
        }
    }

    /// Definition stored under a normalized key.
    pub fn get(&self, key: &str) -> Option<&WordDefinition> {
        self.definitions.get(key)
    }

    /// Every distinct word, ordered by key.
    pub fn all_words(&self) -> &[String] {
        &self.all_words
    }

    /// Words still being learned.
    pub fn unmastered_words(&self) -> &[String] {
        &self.unmastered
    }

    /// Words of one source, in source order.
    pub fn source_words(&self, source_id: &str) -> &[String] {
        self.by_source
            .get(source_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Whether every word list only names words that have a definition.
    pub fn is_consistent(&self) -> bool {
        let known = |word: &String| self.definitions.contains_key(&normalize_word(word));
        self.all_words.len() == self.definitions.len()
            && self.all_words.iter().all(known)
            && self.unmastered.iter().all(known)
            && self.by_source.values().flatten().all(known)
    }
}
