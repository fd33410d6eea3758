//! Script detection and Hangul syllable arithmetic.
//!
//! The morphological layer targets Hangul only. Matching also needs to know
//! which scripts are written without separating word boundaries, because the
//! word-boundary rule of the matcher is skipped for them.

/// First precomposed Hangul syllable (가).
const SYLLABLE_BASE: u32 = 0xAC00;
/// Last precomposed Hangul syllable (힣).
const SYLLABLE_LAST: u32 = 0xD7A3;
/// Number of final-consonant slots per syllable block, including "none".
const FINAL_COUNT: u32 = 28;

/// Final consonant (jongseong) of a Hangul syllable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalConsonant {
    /// ㄴ
    Nieun,
    /// ㄹ
    Rieul,
    /// ㅂ
    Bieup,
    /// ㅆ
    SsangSios,
    /// Any other final consonant, by its slot index.
    Other(u32),
}

impl FinalConsonant {
    fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => None,
            4 => Some(FinalConsonant::Nieun),
            8 => Some(FinalConsonant::Rieul),
            17 => Some(FinalConsonant::Bieup),
            20 => Some(FinalConsonant::SsangSios),
            other => Some(FinalConsonant::Other(other)),
        }
    }
}

/// Whether `c` belongs to one of the Hangul blocks.
pub fn is_hangul(c: char) -> bool {
    matches!(c,
        '\u{AC00}'..='\u{D7AF}' |  // Hangul Syllables
        '\u{1100}'..='\u{11FF}' |  // Hangul Jamo
        '\u{3130}'..='\u{318F}' |  // Hangul Compatibility Jamo
        '\u{A960}'..='\u{A97F}' |  // Hangul Jamo Extended-A
        '\u{D7B0}'..='\u{D7FF}'    // Hangul Jamo Extended-B
    )
}

/// Whether `text` contains any character of the target script.
pub fn is_target_script(text: &str) -> bool {
    text.chars().any(is_hangul)
}

/// Whether `c` belongs to a script written without separating word
/// boundaries that matter to the matcher (Hangul, CJK ideographs, kana).
pub fn is_unsegmented_script(c: char) -> bool {
    is_hangul(c)
        || matches!(c,
            '\u{3040}'..='\u{309F}' |   // Hiragana
            '\u{30A0}'..='\u{30FF}' |   // Katakana
            '\u{3400}'..='\u{4DBF}' |   // CJK Extension A
            '\u{4E00}'..='\u{9FFF}' |   // CJK Unified Ideographs
            '\u{F900}'..='\u{FAFF}' |   // CJK Compatibility Ideographs
            '\u{20000}'..='\u{2A6DF}'   // CJK Extension B
        )
}

/// Final consonant of a precomposed syllable, `None` for open syllables and
/// for anything that is not a precomposed syllable.
pub fn final_consonant(c: char) -> Option<FinalConsonant> {
    let code = c as u32;
    if !(SYLLABLE_BASE..=SYLLABLE_LAST).contains(&code) {
        return None;
    }
    FinalConsonant::from_index((code - SYLLABLE_BASE) % FINAL_COUNT)
}

/// The same syllable with its final consonant removed (갑 → 가).
pub fn without_final_consonant(c: char) -> char {
    let code = c as u32;
    if !(SYLLABLE_BASE..=SYLLABLE_LAST).contains(&code) {
        return c;
    }
    let final_index = (code - SYLLABLE_BASE) % FINAL_COUNT;
    char::from_u32(code - final_index).unwrap_or(c)
}

/// Remove the final consonant of the last syllable of `stem`.
pub fn strip_last_final(stem: &str) -> String {
    let mut chars: Vec<char> = stem.chars().collect();
    if let Some(last) = chars.last_mut() {
        *last = without_final_consonant(*last);
    }
    chars.into_iter().collect()
}
