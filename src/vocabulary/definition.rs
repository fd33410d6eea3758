//! Vocabulary entries.

use serde::{Deserialize, Serialize};

use crate::error::{GlossaError, Result};

/// Canonical lookup key: whitespace collapsed, lower-cased.
pub fn normalize_word(word: &str) -> String {
    word.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A stored word with its definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordDefinition {
    /// The word as written by the user.
    pub word: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etymology: Option<String>,
    /// Source the word belongs to.
    pub source_id: String,
    /// Id of the word's record inside its source.
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub mastered: bool,
}

impl WordDefinition {
    /// New unmastered definition with a fresh node id.
    pub fn new<W, D, S>(word: W, definition: D, source_id: S) -> Self
    where
        W: Into<String>,
        D: Into<String>,
        S: Into<String>,
    {
        WordDefinition {
            word: word.into(),
            definition: definition.into(),
            etymology: None,
            source_id: source_id.into(),
            node_id: uuid::Uuid::new_v4().to_string(),
            color: None,
            mastered: false,
        }
    }

    pub fn with_etymology<S: Into<String>>(mut self, etymology: S) -> Self {
        self.etymology = Some(etymology.into());
        self
    }

    pub fn with_color<S: Into<String>>(mut self, color: S) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_mastered(mut self, mastered: bool) -> Self {
        self.mastered = mastered;
        self
    }

    /// Lookup key of this definition.
    pub fn key(&self) -> String {
        normalize_word(&self.word)
    }

    /// The record written back to the source.
    pub fn to_record(&self) -> WordRecord {
        WordRecord {
            node_id: self.node_id.clone(),
            word: self.word.clone(),
            definition: self.definition.clone(),
            etymology: self.etymology.clone(),
            color: self.color.clone(),
            mastered: self.mastered,
        }
    }
}

/// A word as a vocabulary source stores it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRecord {
    #[serde(alias = "id")]
    pub node_id: String,
    pub word: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etymology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub mastered: bool,
}

impl WordRecord {
    /// Attach the record to `source_id`; records without a word are rejected.
    pub fn into_definition(self, source_id: &str) -> Result<WordDefinition> {
        if self.word.trim().is_empty() {
            return Err(GlossaError::vocabulary(format!(
                "record '{}' in source '{source_id}' has no word",
                self.node_id
            )));
        }
        Ok(WordDefinition {
            word: self.word.trim().to_string(),
            definition: self.definition,
            etymology: self.etymology.filter(|e| !e.is_empty()),
            source_id: source_id.to_string(),
            node_id: self.node_id,
            color: self.color.filter(|c| !c.is_empty()),
            mastered: self.mastered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("  New   York "), "new york");
        assert_eq!(normalize_word("공부하다"), "공부하다");
    }

    #[test]
    fn test_record_round_trip_fields() {
        let json = r#"{"id":"n1","word":" Serendipity ","definition":"luck","mastered":true}"#;
        let record: WordRecord = serde_json::from_str(json).unwrap();
        let definition = record.into_definition("english").unwrap();
        assert_eq!(definition.word, "Serendipity");
        assert_eq!(definition.key(), "serendipity");
        assert_eq!(definition.node_id, "n1");
        assert!(definition.mastered);
        assert_eq!(definition.to_record().node_id, "n1");
    }

    #[test]
    fn test_record_without_word_is_rejected() {
        let record = WordRecord {
            node_id: "n1".to_string(),
            word: "  ".to_string(),
            definition: String::new(),
            etymology: None,
            color: None,
            mastered: false,
        };
        assert!(record.into_definition("s").is_err());
    }

    #[test]
    fn test_fresh_node_ids_differ() {
        let a = WordDefinition::new("a", "", "s");
        let b = WordDefinition::new("a", "", "s");
        assert_ne!(a.node_id, b.node_id);
    }
}
