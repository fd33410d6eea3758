//! Command line argument parsing for the Glossa CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// File names indexed when `--include` is not given.
pub const DEFAULT_INCLUDE: &str = r"\.(md|markdown|txt)$";

/// Glossa - find known vocabulary, and its inflected forms, in text
#[derive(Parser, Debug, Clone)]
#[command(name = "glossa")]
#[command(about = "Find known vocabulary, including inflected Korean forms, in text")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct GlossaArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl GlossaArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Derive the base form of words
    Analyze(AnalyzeArgs),

    /// Build the inflection index of a document directory
    Index(IndexArgs),

    /// Find vocabulary words in a text
    Scan(ScanArgs),

    /// Look up the definition of a word or one of its inflections
    Lookup(LookupArgs),
}

/// Arguments for analyzing words
#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Words to analyze
    #[arg(value_name = "WORD", required = true)]
    pub words: Vec<String>,

    /// Analyze the words as one running text instead of one by one
    #[arg(short, long)]
    pub document: bool,
}

/// Arguments for indexing a document directory
#[derive(Parser, Debug, Clone)]
pub struct IndexArgs {
    /// Directory of documents, searched recursively
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// Regular expression file names must match
    #[arg(long, value_name = "REGEX", default_value = DEFAULT_INCLUDE)]
    pub include: String,

    /// Write the index snapshot (JSON) to this file
    #[arg(short, long, value_name = "SNAPSHOT_FILE")]
    pub snapshot: Option<PathBuf>,
}

/// Vocabulary and documents shared by `scan` and `lookup`.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Vocabulary: a JSON file of word records, or a directory of them
    #[arg(long, value_name = "FILE|DIR")]
    pub vocab: PathBuf,

    /// Directory of documents whose inflections are learned before matching
    #[arg(long, value_name = "DIRECTORY")]
    pub docs: Option<PathBuf>,

    /// Regular expression document file names must match
    #[arg(long, value_name = "REGEX", default_value = DEFAULT_INCLUDE)]
    pub include: String,
}

/// Arguments for scanning a text
#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Text to scan
    #[arg(value_name = "TEXT", required_unless_present = "input")]
    pub text: Option<String>,

    /// Read the text to scan from a file
    #[arg(short, long, value_name = "FILE", conflicts_with = "text")]
    pub input: Option<PathBuf>,

    /// Report every longest match per position instead of non-overlapping ones
    #[arg(long)]
    pub all: bool,
}

/// Arguments for looking up a word
#[derive(Parser, Debug, Clone)]
pub struct LookupArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Word or inflected form to look up
    #[arg(value_name = "WORD")]
    pub word: String,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
