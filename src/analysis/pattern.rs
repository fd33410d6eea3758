//! Compound-word rules.
//!
//! A Korean vocabulary unit often spans several morphemes: a noun glued to the
//! support verb 하다 (공부 + 했 + 다), a bound root with a deriving suffix
//! (깨끗 + 하 + 다), or a verb with the passive auxiliary 지다 (만들 + 어 + 졌 +
//! 다). Each [`CompoundRule`] recognizes one such window of adjacent tokens,
//! optionally followed by a bounded run of grammatical endings, and merges it
//! into one surface/base-form/POS triple. [`CompoundMatcher`] tries the rules in
//! fixed priority order and takes the first that applies.
//!
//! The rules are heuristics. Ambiguous windows resolve to whichever rule comes
//! first in [`CompoundRule::PRIORITY`].

use crate::analysis::token::{
    MorphToken, MorphologyAnalysisResult, is_noun_tag, with_infinitive,
};
use crate::config::AnalyzerConfig;

/// Connective endings that link a verb stem to the passive auxiliary 지다.
const PASSIVE_CONNECTIVES: [&str; 3] = ["아", "어", "여"];
/// Stem of the passive auxiliary 지다.
const PASSIVE_AUXILIARY: &str = "지";

/// One compound pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompoundRule {
    /// Noun + support-verb suffix (NNG/NNP + XSV): 공부했다 → 공부하다.
    NounSupportVerb,
    /// Root + adjective/verb-deriving suffix (XR + XSA/XSV, noun + XSA):
    /// 깨끗했다 → 깨끗하다.
    RootDerivation,
    /// Verb root + passive auxiliary (VV/VA + 아/어/여 + 지): 만들어졌다 →
    /// 만들어지다.
    PassiveVoice,
}

/// A merged compound and the number of tokens it consumed.
#[derive(Clone, Debug, PartialEq)]
pub struct CompoundMatch {
    pub result: MorphologyAnalysisResult,
    pub consumed: usize,
}

impl CompoundRule {
    /// Rules in the order they are tried.
    pub const PRIORITY: [CompoundRule; 3] = [
        CompoundRule::NounSupportVerb,
        CompoundRule::RootDerivation,
        CompoundRule::PassiveVoice,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CompoundRule::NounSupportVerb => "noun_support_verb",
            CompoundRule::RootDerivation => "root_derivation",
            CompoundRule::PassiveVoice => "passive_voice",
        }
    }

    fn confidence(&self, config: &AnalyzerConfig) -> f32 {
        match self {
            CompoundRule::NounSupportVerb => config.noun_support_verb_confidence,
            CompoundRule::RootDerivation => config.root_derivation_confidence,
            CompoundRule::PassiveVoice => config.passive_voice_confidence,
        }
    }

    /// Match the rule's core window at `at`, returning its length and POS tag.
    fn core(&self, tokens: &[MorphToken]) -> Option<(usize, String)> {
        match self {
            CompoundRule::NounSupportVerb => {
                let [noun, suffix, ..] = tokens else {
                    return None;
                };
                (is_noun_tag(noun.primary_tag())
                    && suffix.primary_tag() == "XSV"
                    && suffix.follows(noun))
                .then(|| (2, "XSV".to_string()))
            }
            CompoundRule::RootDerivation => {
                let [root, suffix, ..] = tokens else {
                    return None;
                };
                let root_tag = root.primary_tag();
                let suffix_tag = suffix.primary_tag();
                let derives = match root_tag {
                    "XR" => matches!(suffix_tag, "XSA" | "XSV"),
                    tag if is_noun_tag(tag) => suffix_tag == "XSA",
                    _ => false,
                };
                (derives && suffix.follows(root)).then(|| (2, suffix_tag.to_string()))
            }
            CompoundRule::PassiveVoice => {
                let [verb, connective, auxiliary, ..] = tokens else {
                    return None;
                };
                (matches!(verb.primary_tag(), "VV" | "VA")
                    && connective.primary_tag() == "EC"
                    && PASSIVE_CONNECTIVES.contains(&connective.base.as_str())
                    && auxiliary.primary_tag() == "VX"
                    && auxiliary.base == PASSIVE_AUXILIARY
                    && connective.follows(verb)
                    && auxiliary.follows(connective))
                .then(|| (3, "VV".to_string()))
            }
        }
    }

    /// Try this rule on the tokens starting at `at`.
    ///
    /// `text` is the analyzed text the token spans point into; when present
    /// and spans are known, the merged surface is sliced from it.
    pub fn apply(
        &self,
        tokens: &[MorphToken],
        at: usize,
        text: Option<&str>,
        config: &AnalyzerConfig,
    ) -> Option<CompoundMatch> {
        let window = tokens.get(at..)?;
        let (core_len, pos) = self.core(window)?;

        let stem: String = window[..core_len]
            .iter()
            .map(|token| token.base.as_str())
            .collect();
        if stem.is_empty() {
            return None;
        }

        let end = absorb_endings(tokens, at + core_len, config.max_ending_lookahead);
        let surface = merged_surface(&tokens[at..end], text);

        Some(CompoundMatch {
            result: MorphologyAnalysisResult::new(
                surface,
                with_infinitive(&stem),
                pos,
                self.confidence(config),
            ),
            consumed: end - at,
        })
    }
}

/// Extend a token run ending before `end` over at most `max` directly
/// following ending tokens; returns the new exclusive end.
pub fn absorb_endings(tokens: &[MorphToken], end: usize, max: usize) -> usize {
    let mut end = end;
    let mut absorbed = 0;
    while absorbed < max && end < tokens.len() && end > 0 {
        let next = &tokens[end];
        if !next.is_ending() || !next.follows(&tokens[end - 1]) {
            break;
        }
        end += 1;
        absorbed += 1;
    }
    end
}

/// Surface text covered by a run of tokens.
pub fn merged_surface(run: &[MorphToken], text: Option<&str>) -> String {
    if let (Some(text), Some(first)) = (text, run.first()) {
        let end = run.iter().filter_map(|token| token.span).map(|(_, end)| end).max();
        if let (Some((start, _)), Some(end)) = (first.span, end) {
            if let Some(slice) = text.get(start..end) {
                return slice.to_string();
            }
        }
    }
    run.iter().map(|token| token.surface.as_str()).collect()
}

/// Tries the compound rules in priority order.
#[derive(Debug, Clone)]
pub struct CompoundMatcher {
    rules: Vec<CompoundRule>,
    config: AnalyzerConfig,
}

impl CompoundMatcher {
    /// Matcher with the default rule priority.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_rules(CompoundRule::PRIORITY.to_vec(), config)
    }

    /// Matcher with a custom rule order.
    pub fn with_rules(rules: Vec<CompoundRule>, config: AnalyzerConfig) -> Self {
        CompoundMatcher { rules, config }
    }

    pub fn rules(&self) -> &[CompoundRule] {
        &self.rules
    }

    /// First rule that matches at `at`.
    pub fn match_at(
        &self,
        tokens: &[MorphToken],
        at: usize,
        text: Option<&str>,
    ) -> Option<CompoundMatch> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(tokens, at, text, &self.config))
    }

    /// First match at any position, scanning left to right.
    pub fn first_match(&self, tokens: &[MorphToken], text: Option<&str>) -> Option<CompoundMatch> {
        (0..tokens.len()).find_map(|at| self.match_at(tokens, at, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(surface: &str, base: &str, pos: &str) -> MorphToken {
        MorphToken::new(surface, base, pos)
    }

    #[test]
    fn test_noun_support_verb_with_endings() {
        let tokens = vec![
            tok("공부", "공부", "NNG"),
            tok("했", "하", "XSV+EP"),
            tok("다", "다", "EF"),
        ];
        let matcher = CompoundMatcher::new(AnalyzerConfig::default());
        let found = matcher.match_at(&tokens, 0, None).unwrap();
        assert_eq!(found.consumed, 3);
        assert_eq!(found.result.surface, "공부했다");
        assert_eq!(found.result.base_form, "공부하다");
        assert_eq!(found.result.pos, "XSV");
        assert_eq!(found.result.confidence, 0.95);
    }

    #[test]
    fn test_root_derivation() {
        let tokens = vec![
            tok("깨끗", "깨끗", "XR"),
            tok("한", "하", "XSA+ETM"),
            tok("방", "방", "NNG"),
        ];
        let found = CompoundRule::RootDerivation
            .apply(&tokens, 0, None, &AnalyzerConfig::default())
            .unwrap();
        assert_eq!(found.consumed, 2);
        assert_eq!(found.result.base_form, "깨끗하다");
        assert_eq!(found.result.surface, "깨끗한");
        assert_eq!(found.result.pos, "XSA");
    }

    #[test]
    fn test_passive_voice() {
        let tokens = vec![
            tok("만들", "만들", "VV"),
            tok("어", "어", "EC"),
            tok("졌", "지", "VX+EP"),
            tok("다", "다", "EF"),
        ];
        let matcher = CompoundMatcher::new(AnalyzerConfig::default());
        let found = matcher.first_match(&tokens, None).unwrap();
        assert_eq!(found.result.base_form, "만들어지다");
        assert_eq!(found.result.surface, "만들어졌다");
        assert_eq!(found.result.confidence, 0.90);
        assert_eq!(found.consumed, 4);
    }

    #[test]
    fn test_lookahead_is_bounded() {
        let mut tokens = vec![tok("공부", "공부", "NNG"), tok("하", "하", "XSV")];
        for _ in 0..8 {
            tokens.push(tok("어", "어", "EC"));
        }
        let config = AnalyzerConfig::default().with_max_ending_lookahead(5);
        let found = CompoundRule::NounSupportVerb
            .apply(&tokens, 0, None, &config)
            .unwrap();
        assert_eq!(found.consumed, 7);
    }

    #[test]
    fn test_spaced_tokens_do_not_merge() {
        let text = "공부 했다";
        let tokens = vec![
            tok("공부", "공부", "NNG").with_span(0, 6),
            tok("했", "하", "XSV+EP").with_span(7, 10),
            tok("다", "다", "EF").with_span(10, 13),
        ];
        let matcher = CompoundMatcher::new(AnalyzerConfig::default());
        assert!(matcher.match_at(&tokens, 0, Some(text)).is_none());
    }

    #[test]
    fn test_surface_sliced_from_text() {
        let text = "공부했다";
        let tokens = vec![
            tok("공부", "공부", "NNG").with_span(0, 6),
            tok("하", "하", "XSV").with_span(6, 9),
            tok("었", "었", "EP").with_span(6, 9),
            tok("다", "다", "EF").with_span(9, 12),
        ];
        let found = CompoundMatcher::new(AnalyzerConfig::default())
            .match_at(&tokens, 0, Some(text))
            .unwrap();
        assert_eq!(found.consumed, 4);
        assert_eq!(found.result.surface, "공부했다");
    }

    #[test]
    fn test_priority_order() {
        let matcher = CompoundMatcher::new(AnalyzerConfig::default());
        assert_eq!(
            matcher.rules(),
            &[
                CompoundRule::NounSupportVerb,
                CompoundRule::RootDerivation,
                CompoundRule::PassiveVoice
            ]
        );
    }
}
