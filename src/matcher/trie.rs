//! Character trie for locating many words in a text at once.
//!
//! Words are stored along their lower-cased character sequence, so matching
//! is case-insensitive while [`Match::word`] still reports the word as it was
//! added. A match must not start or end in the middle of a word: the character
//! before it and the character after it may not be alphanumeric. Scripts that
//! are written without spaces between words (Hangul, kana, CJK ideographs)
//! skip that check on the edge where they appear, so a Korean noun still
//! matches with a particle glued to it.
//!
//! # Examples
//!
//! ```
//! use glossa::matcher::PrefixMatcher;
//!
//! let mut matcher = PrefixMatcher::new();
//! matcher.add_word("cat", "cat".to_string());
//! matcher.add_word("공부", "공부하다".to_string());
//!
//! assert!(matcher.find_all_matches("concatenate").is_empty());
//!
//! let matches = matcher.find_all_matches("The Cat likes 공부를");
//! assert_eq!(matches.len(), 2);
//! ```

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::script::is_unsegmented_script;

/// A word found in a text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match<P> {
    /// The matched word, in the case it was added with.
    pub word: String,
    /// Byte offset of the first matched character.
    pub start: usize,
    /// Byte offset just past the last matched character.
    pub end: usize,
    /// Payload stored with the word.
    pub payload: P,
}

impl<P> Match<P> {
    /// Length of the match in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Clone, Debug)]
struct Terminal<P> {
    word: String,
    payload: P,
}

#[derive(Clone, Debug)]
struct TrieNode<P> {
    children: AHashMap<char, TrieNode<P>>,
    terminal: Option<Terminal<P>>,
}

impl<P> TrieNode<P> {
    fn new() -> Self {
        TrieNode {
            children: AHashMap::new(),
            terminal: None,
        }
    }
}

fn lowercase_path(word: &str) -> impl Iterator<Item = char> + '_ {
    word.chars().flat_map(char::to_lowercase)
}

/// Case-insensitive multi-pattern matcher.
#[derive(Clone, Debug)]
pub struct PrefixMatcher<P> {
    root: TrieNode<P>,
    word_count: usize,
}

impl<P> Default for PrefixMatcher<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PrefixMatcher<P> {
    pub fn new() -> Self {
        PrefixMatcher {
            root: TrieNode::new(),
            word_count: 0,
        }
    }

    /// Add a word. Adding the same (case-insensitive) word again replaces its
    /// payload.
    pub fn add_word(&mut self, word: &str, payload: P) {
        if word.is_empty() {
            return;
        }

        let mut current = &mut self.root;
        for c in lowercase_path(word) {
            current = current.children.entry(c).or_insert_with(TrieNode::new);
        }

        if current.terminal.is_none() {
            self.word_count += 1;
        }
        current.terminal = Some(Terminal {
            word: word.to_string(),
            payload,
        });
    }

    /// Whether `word` was added, ignoring case.
    pub fn contains(&self, word: &str) -> bool {
        let mut current = &self.root;
        for c in lowercase_path(word) {
            match current.children.get(&c) {
                Some(next) => current = next,
                None => return false,
            }
        }
        current.terminal.is_some()
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.word_count
    }

    pub fn is_empty(&self) -> bool {
        self.word_count == 0
    }

    /// Remove every word.
    pub fn clear(&mut self) {
        self.root = TrieNode::new();
        self.word_count = 0;
    }

    /// Whether a match over `chars[first..=last]` sits on word boundaries.
    fn on_boundaries(chars: &[(usize, char)], first: usize, last: usize) -> bool {
        let starts_clean = is_unsegmented_script(chars[first].1)
            || first == 0
            || !chars[first - 1].1.is_alphanumeric();
        let ends_clean = is_unsegmented_script(chars[last].1)
            || last + 1 == chars.len()
            || !chars[last + 1].1.is_alphanumeric();
        starts_clean && ends_clean
    }
}

impl<P: Clone> PrefixMatcher<P> {
    /// Every longest word match per start position, in start order.
    ///
    /// Matches may overlap; see
    /// [`resolve_overlaps`](crate::matcher::overlap::resolve_overlaps).
    pub fn find_all_matches(&self, text: &str) -> Vec<Match<P>> {
        let mut matches = Vec::new();
        if self.is_empty() {
            return matches;
        }

        let chars: Vec<(usize, char)> = text.char_indices().collect();
        for first in 0..chars.len() {
            let mut node = &self.root;
            let mut longest: Option<(usize, &Terminal<P>)> = None;

            'walk: for (last, &(_, c)) in chars.iter().enumerate().skip(first) {
                for lower in c.to_lowercase() {
                    match node.children.get(&lower) {
                        Some(next) => node = next,
                        None => break 'walk,
                    }
                }
                if let Some(terminal) = &node.terminal
                    && Self::on_boundaries(&chars, first, last)
                {
                    longest = Some((last, terminal));
                }
            }

            if let Some((last, terminal)) = longest {
                let (last_offset, last_char) = chars[last];
                matches.push(Match {
                    word: terminal.word.clone(),
                    start: chars[first].0,
                    end: last_offset + last_char.len_utf8(),
                    payload: terminal.payload.clone(),
                });
            }
        }

        matches
    }
}
