//! Output formatting for CLI commands.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::analysis::token::MorphologyAnalysisResult;
use crate::cli::args::{GlossaArgs, OutputFormat};
use crate::error::Result;
use crate::vocabulary::definition::WordDefinition;

/// Results that can print themselves for a terminal.
pub trait HumanOutput {
    fn print_human(&self, args: &GlossaArgs);
}

/// Result of `analyze`, one entry per word.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub results: Vec<WordAnalysis>,
}

#[derive(Debug, Serialize)]
pub struct WordAnalysis {
    pub word: String,
    /// `None` for words outside the target script.
    pub analysis: Option<MorphologyAnalysisResult>,
}

/// Result of `analyze --document`.
#[derive(Debug, Serialize)]
pub struct DocumentReport {
    pub inflections: BTreeMap<String, BTreeSet<String>>,
    pub results: Vec<MorphologyAnalysisResult>,
}

/// Result of `index`.
#[derive(Debug, Default, Serialize)]
pub struct IndexReport {
    pub documents: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub inflections: BTreeMap<String, BTreeSet<String>>,
}

/// One match reported by `scan`.
#[derive(Debug, Serialize)]
pub struct MatchReport {
    /// Text as it was added to the matcher.
    pub matched: String,
    /// Vocabulary word the match stands for.
    pub word: String,
    pub start: usize,
    pub end: usize,
    pub definition: Option<String>,
}

/// Result of `scan`.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub vocabulary_size: usize,
    pub matches: Vec<MatchReport>,
}

/// Result of `lookup`.
#[derive(Debug, Serialize)]
pub struct LookupReport {
    pub query: String,
    pub definition: Option<WordDefinition>,
    pub inflections: BTreeSet<String>,
}

/// Output a result in the selected format.
pub fn output_result<T: Serialize + HumanOutput>(
    message: &str,
    result: &T,
    args: &GlossaArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                println!("{message}");
                println!();
            }
            result.print_human(args);
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_json<T: Serialize>(result: &T, args: &GlossaArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

fn print_inflections(inflections: &BTreeMap<String, BTreeSet<String>>) {
    for (base, surfaces) in inflections {
        let surfaces: Vec<&str> = surfaces.iter().map(String::as_str).collect();
        println!("  {base}: {}", surfaces.join(", "));
    }
}

impl HumanOutput for AnalysisReport {
    fn print_human(&self, _args: &GlossaArgs) {
        for entry in &self.results {
            match &entry.analysis {
                Some(result) => println!(
                    "{} → {} [{}] ({:.2})",
                    entry.word, result.base_form, result.pos, result.confidence
                ),
                None => println!("{} → (not Korean)", entry.word),
            }
        }
    }
}

impl HumanOutput for DocumentReport {
    fn print_human(&self, args: &GlossaArgs) {
        if self.inflections.is_empty() {
            println!("No predicates found.");
            return;
        }
        println!("Base forms:");
        print_inflections(&self.inflections);
        if args.verbosity() > 1 {
            println!();
            for result in &self.results {
                println!(
                    "  {} → {} [{}] ({:.2})",
                    result.surface, result.base_form, result.pos, result.confidence
                );
            }
        }
    }
}

impl HumanOutput for IndexReport {
    fn print_human(&self, args: &GlossaArgs) {
        println!(
            "Indexed {} of {} documents ({} skipped, {} failed) in {} ms",
            self.indexed, self.documents, self.skipped, self.failed, self.duration_ms
        );
        println!("{} base forms", self.inflections.len());
        if args.verbosity() > 1 {
            print_inflections(&self.inflections);
        }
    }
}

impl HumanOutput for ScanReport {
    fn print_human(&self, _args: &GlossaArgs) {
        if self.matches.is_empty() {
            println!("No vocabulary found ({} words known).", self.vocabulary_size);
            return;
        }
        for m in &self.matches {
            let word = if m.matched == m.word {
                m.word.clone()
            } else {
                format!("{} ({})", m.matched, m.word)
            };
            match &m.definition {
                Some(definition) => println!("{}..{}  {word}: {definition}", m.start, m.end),
                None => println!("{}..{}  {word}", m.start, m.end),
            }
        }
    }
}

impl HumanOutput for LookupReport {
    fn print_human(&self, _args: &GlossaArgs) {
        let Some(definition) = &self.definition else {
            println!("'{}' is not in the vocabulary.", self.query);
            return;
        };
        println!("{}", definition.word);
        println!("  {}", definition.definition);
        if let Some(etymology) = &definition.etymology {
            println!("  etymology: {etymology}");
        }
        println!("  source: {}", definition.source_id);
        if definition.mastered {
            println!("  mastered");
        }
        if !self.inflections.is_empty() {
            let inflections: Vec<&str> = self.inflections.iter().map(String::as_str).collect();
            println!("  seen as: {}", inflections.join(", "));
        }
    }
}
