//! Pluggable morphological backend and the token adapter at its boundary.
//!
//! Backends disagree about what a token looks like. Some hand out key/value
//! records, mecab-style analyzers hand out a surface plus a feature array, and
//! morpheme analyzers hand out typed form/tag/lemma objects. [`RawToken`]
//! captures those shapes and [`normalize_token`] turns each of them into a
//! [`MorphToken`] exactly once, before any pattern logic runs.
//!
//! A backend is created through a [`BackendLoader`], which the analyzer calls
//! at most once per lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::analysis::token::{INFINITIVE_MARKER, MorphToken, is_predicate_tag, primary_tag};
use crate::error::{GlossaError, Result};

/// Index of the POS tag in a mecab-ko-dic feature array.
const FEATURE_POS: usize = 0;
/// Index of the morpheme expression (`하/XSV/*+았/EP/*`) in a feature array.
const FEATURE_EXPRESSION: usize = 7;

/// A token exactly as a backend produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum RawToken {
    /// Key/value record. Recognized keys: `surface`/`form`/`text`,
    /// `pos`/`tag`, `lemma`/`base`/`basic_form`, `expression`, `start`, `end`.
    Fields(HashMap<String, String>),

    /// Mecab-style surface with a feature array.
    Features {
        surface: String,
        features: Vec<String>,
        span: Option<(usize, usize)>,
    },

    /// Typed morpheme with an optional dictionary lemma.
    Morpheme {
        form: String,
        tag: String,
        lemma: Option<String>,
        span: Option<(usize, usize)>,
    },
}

impl RawToken {
    /// Build a key/value token from pairs.
    pub fn fields<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RawToken::Fields(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a typed morpheme without lemma or span.
    pub fn morpheme<F: Into<String>, T: Into<String>>(form: F, tag: T) -> Self {
        RawToken::Morpheme {
            form: form.into(),
            tag: tag.into(),
            lemma: None,
            span: None,
        }
    }
}

fn first_field<'a>(fields: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .map(|value| value.as_str())
        .find(|value| !value.is_empty())
}

fn parse_span(fields: &HashMap<String, String>) -> Result<Option<(usize, usize)>> {
    match (fields.get("start"), fields.get("end")) {
        (Some(start), Some(end)) => {
            let start = start
                .parse::<usize>()
                .map_err(|e| GlossaError::analysis(format!("invalid token start '{start}': {e}")))?;
            let end = end
                .parse::<usize>()
                .map_err(|e| GlossaError::analysis(format!("invalid token end '{end}': {e}")))?;
            if end < start {
                return Err(GlossaError::analysis(format!(
                    "token span ends before it starts: {start}..{end}"
                )));
            }
            Ok(Some((start, end)))
        }
        _ => Ok(None),
    }
}

/// Leading morpheme of an expression such as `하/XSV/*+았/EP/*`.
fn expression_head(expression: &str) -> Option<&str> {
    if expression.is_empty() || expression == "*" {
        return None;
    }
    let head = expression.split('+').next()?;
    let form = head.split('/').next()?;
    if form.is_empty() || form == "*" {
        None
    } else {
        Some(form)
    }
}

/// Turn a dictionary lemma into a stem for verb/adjective tags (먹다 → 먹).
fn lemma_to_stem(lemma: &str, pos: &str) -> String {
    if is_predicate_tag(primary_tag(pos)) && lemma.chars().count() > 1 {
        if let Some(stem) = lemma.strip_suffix(INFINITIVE_MARKER) {
            return stem.to_string();
        }
    }
    lemma.to_string()
}

fn build_token(
    surface: &str,
    pos: &str,
    lemma: Option<&str>,
    expression: Option<&str>,
    span: Option<(usize, usize)>,
) -> Result<MorphToken> {
    if surface.is_empty() {
        return Err(GlossaError::analysis("token without surface"));
    }
    if pos.is_empty() || pos == "*" {
        return Err(GlossaError::analysis(format!(
            "token '{surface}' without a POS tag"
        )));
    }

    let base = if let Some(head) = expression.and_then(expression_head) {
        head.to_string()
    } else if let Some(lemma) = lemma.filter(|l| !l.is_empty() && *l != "*") {
        lemma_to_stem(lemma, pos)
    } else {
        surface.to_string()
    };

    let token = MorphToken::new(surface, base, pos);
    Ok(match span {
        Some((start, end)) => token.with_span(start, end),
        None => token,
    })
}

/// Translate one backend token into a [`MorphToken`].
pub fn normalize_token(raw: &RawToken) -> Result<MorphToken> {
    match raw {
        RawToken::Fields(fields) => {
            let surface = first_field(fields, &["surface", "form", "text"]).unwrap_or_default();
            let pos = first_field(fields, &["pos", "tag"]).unwrap_or_default();
            let lemma = first_field(fields, &["lemma", "base", "basic_form"]);
            let expression = first_field(fields, &["expression"]);
            build_token(surface, pos, lemma, expression, parse_span(fields)?)
        }
        RawToken::Features {
            surface,
            features,
            span,
        } => {
            let pos = features
                .get(FEATURE_POS)
                .map(String::as_str)
                .unwrap_or_default();
            let expression = features.get(FEATURE_EXPRESSION).map(String::as_str);
            build_token(surface, pos, None, expression, *span)
        }
        RawToken::Morpheme {
            form,
            tag,
            lemma,
            span,
        } => build_token(form, tag, lemma.as_deref(), None, *span),
    }
}

/// Normalize a backend token stream, skipping tokens that cannot be read.
pub fn normalize_tokens(raw: &[RawToken]) -> Vec<MorphToken> {
    raw.iter()
        .filter_map(|token| match normalize_token(token) {
            Ok(token) => Some(token),
            Err(e) => {
                debug!("Skipping malformed backend token {token:?}: {e}");
                None
            }
        })
        .collect()
}

/// A morphological tokenizer.
#[async_trait]
pub trait MorphemeBackend: Send + Sync {
    /// Tokenize `text` into an ordered token sequence.
    async fn tokenize(&self, text: &str) -> Result<Vec<RawToken>>;

    /// Release native resources. Called once when the analyzer is destroyed.
    fn release(&self) {}

    /// Name of this backend (for logs).
    fn name(&self) -> &'static str;
}

/// Creates a backend; may fail when models or libraries are missing.
#[async_trait]
pub trait BackendLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn MorphemeBackend>>;
}

/// Loader handing out an already constructed backend.
pub struct StaticBackendLoader {
    backend: Arc<dyn MorphemeBackend>,
}

impl StaticBackendLoader {
    pub fn new(backend: Arc<dyn MorphemeBackend>) -> Self {
        StaticBackendLoader { backend }
    }
}

impl std::fmt::Debug for StaticBackendLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticBackendLoader")
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[async_trait]
impl BackendLoader for StaticBackendLoader {
    async fn load(&self) -> Result<Arc<dyn MorphemeBackend>> {
        Ok(Arc::clone(&self.backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fields() {
        let raw = RawToken::fields([
            ("surface", "먹었"),
            ("pos", "VV+EP"),
            ("lemma", "먹다"),
            ("start", "0"),
            ("end", "6"),
        ]);
        let token = normalize_token(&raw).unwrap();
        assert_eq!(token.surface, "먹었");
        assert_eq!(token.base, "먹");
        assert_eq!(token.pos, "VV+EP");
        assert_eq!(token.span, Some((0, 6)));
    }

    #[test]
    fn test_normalize_mecab_features() {
        let raw = RawToken::Features {
            surface: "했".to_string(),
            features: "XSV+EP,*,T,했,Inflect,XSV,EP,하/XSV/*+았/EP/*"
                .split(',')
                .map(str::to_string)
                .collect(),
            span: None,
        };
        let token = normalize_token(&raw).unwrap();
        assert_eq!(token.surface, "했");
        assert_eq!(token.base, "하");
        assert_eq!(token.pos, "XSV+EP");
    }

    #[test]
    fn test_normalize_morpheme_without_lemma() {
        let token = normalize_token(&RawToken::morpheme("공부", "NNG")).unwrap();
        assert_eq!(token.base, "공부");
    }

    #[test]
    fn test_noun_lemma_keeps_final_da() {
        let raw = RawToken::Morpheme {
            form: "바다".to_string(),
            tag: "NNG".to_string(),
            lemma: Some("바다".to_string()),
            span: None,
        };
        assert_eq!(normalize_token(&raw).unwrap().base, "바다");
    }

    #[test]
    fn test_malformed_tokens_are_skipped() {
        let tokens = normalize_tokens(&[
            RawToken::fields([("surface", "공부")]),
            RawToken::fields([("pos", "NNG")]),
            RawToken::fields([("surface", "x"), ("pos", "SL"), ("start", "4"), ("end", "1")]),
            RawToken::morpheme("공부", "NNG"),
        ]);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].surface, "공부");
    }
}
