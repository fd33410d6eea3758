//! Rule-based ending stripper for Korean predicates.
//!
//! Used when no morphological backend is available, or when it yields nothing
//! usable. A priority-ordered table of common grammatical endings is matched
//! against the end of the word; the first rule that fits strips its ending and
//! rebuilds the dictionary form from the remaining stem.

use crate::analysis::script::{FinalConsonant, final_consonant, strip_last_final};
use crate::analysis::token::{INFINITIVE_MARKER, with_infinitive};

/// How the dictionary form is rebuilt from the stem left after stripping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconstruction {
    /// stem + 다 (먹었습니다 → 먹다).
    AppendMarker,
    /// stem + 하다, for endings that swallowed a contracted 하 (공부했다 → 공부하다).
    RestoreSupportVerb,
    /// Drop the stem's final consonant, then + 다 (갑니다 → 가다).
    DropFinalConsonant,
}

/// One row of the ending table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndingRule {
    /// The ending text matched at the end of the word.
    pub ending: &'static str,
    /// How to rebuild the base form.
    pub reconstruction: Reconstruction,
    /// Final consonant the stem's last syllable must carry for the rule to fit.
    pub requires_final: Option<FinalConsonant>,
}

impl EndingRule {
    pub const fn new(ending: &'static str, reconstruction: Reconstruction) -> Self {
        EndingRule {
            ending,
            reconstruction,
            requires_final: None,
        }
    }

    pub const fn requiring(
        ending: &'static str,
        reconstruction: Reconstruction,
        final_consonant: FinalConsonant,
    ) -> Self {
        EndingRule {
            ending,
            reconstruction,
            requires_final: Some(final_consonant),
        }
    }

    /// Strip this rule's ending from `word` and rebuild the base form.
    pub fn apply(&self, word: &str) -> Option<String> {
        let stem = word.strip_suffix(self.ending)?;
        if stem.is_empty() {
            return None;
        }
        if let Some(required) = self.requires_final {
            let last = stem.chars().next_back()?;
            if final_consonant(last) != Some(required) {
                return None;
            }
        }

        let base = match self.reconstruction {
            Reconstruction::AppendMarker => with_infinitive(stem),
            Reconstruction::RestoreSupportVerb => format!("{stem}하{INFINITIVE_MARKER}"),
            Reconstruction::DropFinalConsonant => with_infinitive(&strip_last_final(stem)),
        };
        Some(base)
    }
}

use Reconstruction::{AppendMarker, DropFinalConsonant, RestoreSupportVerb};

/// The built-in table, most specific endings first.
const KOREAN_ENDINGS: &[EndingRule] = &[
    // Formal polite (합쇼체)
    EndingRule::new("하였습니다", RestoreSupportVerb),
    EndingRule::new("했습니다", RestoreSupportVerb),
    EndingRule::new("했습니까", RestoreSupportVerb),
    EndingRule::new("었습니다", AppendMarker),
    EndingRule::new("았습니다", AppendMarker),
    EndingRule::new("였습니다", AppendMarker),
    EndingRule::new("겠습니다", AppendMarker),
    EndingRule::new("습니다", AppendMarker),
    EndingRule::new("습니까", AppendMarker),
    EndingRule::requiring("니다", DropFinalConsonant, FinalConsonant::Bieup),
    EndingRule::requiring("니까", DropFinalConsonant, FinalConsonant::Bieup),
    // Contracted 하 + 어/었
    EndingRule::new("했어요", RestoreSupportVerb),
    EndingRule::new("했는데", RestoreSupportVerb),
    EndingRule::new("했지만", RestoreSupportVerb),
    EndingRule::new("했으며", RestoreSupportVerb),
    EndingRule::new("했어", RestoreSupportVerb),
    EndingRule::new("했다", RestoreSupportVerb),
    EndingRule::new("했고", RestoreSupportVerb),
    EndingRule::new("해요", RestoreSupportVerb),
    EndingRule::new("해서", RestoreSupportVerb),
    EndingRule::new("해도", RestoreSupportVerb),
    EndingRule::new("해야", RestoreSupportVerb),
    // Past tense
    EndingRule::new("었어요", AppendMarker),
    EndingRule::new("았어요", AppendMarker),
    EndingRule::new("었는데", AppendMarker),
    EndingRule::new("았는데", AppendMarker),
    EndingRule::new("었지만", AppendMarker),
    EndingRule::new("았지만", AppendMarker),
    EndingRule::new("었다", AppendMarker),
    EndingRule::new("았다", AppendMarker),
    EndingRule::new("였다", AppendMarker),
    EndingRule::new("었고", AppendMarker),
    EndingRule::new("았고", AppendMarker),
    // Polite informal (해요체)
    EndingRule::new("어요", AppendMarker),
    EndingRule::new("아요", AppendMarker),
    // Plain present
    EndingRule::new("는다", AppendMarker),
    EndingRule::requiring("다", DropFinalConsonant, FinalConsonant::Nieun),
    // Connectives
    EndingRule::new("으면서", AppendMarker),
    EndingRule::new("면서", AppendMarker),
    EndingRule::new("으면", AppendMarker),
    EndingRule::new("는데", AppendMarker),
    EndingRule::new("지만", AppendMarker),
    EndingRule::new("어서", AppendMarker),
    EndingRule::new("아서", AppendMarker),
    EndingRule::new("으며", AppendMarker),
];

/// An ordered ending table.
#[derive(Debug, Clone)]
pub struct EndingRules {
    rules: Vec<EndingRule>,
}

impl Default for EndingRules {
    fn default() -> Self {
        Self::korean()
    }
}

impl EndingRules {
    /// The built-in Korean table.
    pub fn korean() -> Self {
        EndingRules {
            rules: KOREAN_ENDINGS.to_vec(),
        }
    }

    /// A custom table; rules are tried in the given order.
    pub fn with_rules(rules: Vec<EndingRule>) -> Self {
        EndingRules { rules }
    }

    pub fn rules(&self) -> &[EndingRule] {
        &self.rules
    }

    /// First rule that fits `word`, with the rebuilt base form.
    pub fn strip(&self, word: &str) -> Option<(String, &EndingRule)> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(word).map(|base| (base, rule)))
    }
}
