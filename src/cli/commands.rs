//! Command implementations for the Glossa CLI.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, UNIX_EPOCH};

use log::{debug, info, warn};
use regex::Regex;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::GlossaConfig;
use crate::engine::Engine;
use crate::error::{GlossaError, Result};
use crate::index::document::IndexOutcome;
use crate::vocabulary::definition::WordRecord;
use crate::vocabulary::source::JsonFileSource;

/// Execute a CLI command.
pub fn execute_command(args: GlossaArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            GlossaConfig::from_file(path)?
        }
        None => GlossaConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match &args.command {
            Command::Analyze(analyze_args) => analyze_words(analyze_args, config, &args).await,
            Command::Index(index_args) => index_directory(index_args, config, &args).await,
            Command::Scan(scan_args) => scan_text(scan_args, config, &args).await,
            Command::Lookup(lookup_args) => lookup_word(lookup_args, config, &args).await,
        }
    })
}

/// Derive base forms.
async fn analyze_words(
    args: &AnalyzeArgs,
    config: GlossaConfig,
    cli_args: &GlossaArgs,
) -> Result<()> {
    let engine = Engine::new(config);
    let analyzer = engine.analyzer();

    if args.document {
        let text = args.words.join(" ");
        let analysis = analyzer.analyze_document(&text).await?;
        output_result(
            "Document analysis",
            &DocumentReport {
                inflections: analysis.base_form_to_surfaces,
                results: analysis.results,
            },
            cli_args,
        )?;
    } else {
        let mut results = Vec::with_capacity(args.words.len());
        for word in &args.words {
            results.push(WordAnalysis {
                word: word.clone(),
                analysis: analyzer.analyze_word(word).await,
            });
        }
        output_result("Word analysis", &AnalysisReport { results }, cli_args)?;
    }

    engine.shutdown().await;
    Ok(())
}

/// Index a directory and report the inflections found.
async fn index_directory(
    args: &IndexArgs,
    config: GlossaConfig,
    cli_args: &GlossaArgs,
) -> Result<()> {
    let engine = Engine::new(config);
    let include = compile_include(&args.include)?;
    let mut report = index_documents(&engine, &args.directory, &include).await?;
    report.inflections = engine.index().global_index();

    if let Some(snapshot_path) = &args.snapshot {
        fs::write(snapshot_path, engine.index().snapshot()?)?;
        info!("Wrote index snapshot to {}", snapshot_path.display());
    }

    output_result(
        &format!("Indexed {}", args.directory.display()),
        &report,
        cli_args,
    )?;
    engine.shutdown().await;
    Ok(())
}

/// Find vocabulary words in a text.
async fn scan_text(args: &ScanArgs, config: GlossaConfig, cli_args: &GlossaArgs) -> Result<()> {
    let text = match (&args.text, &args.input) {
        (_, Some(path)) => fs::read_to_string(path)?,
        (Some(text), None) => text.clone(),
        (None, None) => return Err(GlossaError::invalid_argument("no text to scan")),
    };

    let engine = open_corpus(&args.corpus, config).await?;
    let found = if args.all {
        engine.find_all_matches(&text)
    } else {
        engine.scan(&text)
    };

    let mut matches = Vec::with_capacity(found.len());
    for m in found {
        let definition = engine
            .resolve_definition(&m.payload)
            .await
            .map(|definition| definition.definition);
        matches.push(MatchReport {
            matched: m.word,
            word: m.payload,
            start: m.start,
            end: m.end,
            definition,
        });
    }

    output_result(
        "Scan results",
        &ScanReport {
            vocabulary_size: engine.store().len(),
            matches,
        },
        cli_args,
    )?;
    engine.shutdown().await;
    Ok(())
}

/// Look up a word, following inflections to their base form.
async fn lookup_word(args: &LookupArgs, config: GlossaConfig, cli_args: &GlossaArgs) -> Result<()> {
    let engine = open_corpus(&args.corpus, config).await?;
    let definition = engine.resolve_definition(&args.word).await;
    let inflections = match &definition {
        Some(definition) => engine.get_all_inflections(&definition.word),
        None => Default::default(),
    };

    output_result(
        &format!("Lookup '{}'", args.word),
        &LookupReport {
            query: args.word.clone(),
            definition,
            inflections,
        },
        cli_args,
    )?;
    engine.shutdown().await;
    Ok(())
}

/// Engine with the vocabulary loaded, the documents indexed and a matcher
/// published.
async fn open_corpus(args: &CorpusArgs, config: GlossaConfig) -> Result<Engine> {
    let engine = if args.vocab.is_dir() {
        let engine = Engine::builder(config)
            .source(Arc::new(JsonFileSource::new(&args.vocab)))
            .build();
        engine.load_sources().await?;
        engine
    } else {
        let engine = Engine::new(config);
        let source_id = args
            .vocab
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("vocabulary")
            .to_string();
        let records = read_records(&args.vocab)?;
        let loaded = engine.store().load_source(&source_id, records);
        info!("Loaded {loaded} definitions from {}", args.vocab.display());
        engine
    };

    if let Some(docs) = &args.docs {
        let include = compile_include(&args.include)?;
        index_documents(&engine, docs, &include).await?;
    }
    engine.refresh().await;
    Ok(engine)
}

fn read_records(path: &Path) -> Result<Vec<WordRecord>> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        GlossaError::source(format!("failed to parse {}: {e}", path.display()))
    })
}

fn compile_include(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| GlossaError::invalid_argument(format!("--include '{pattern}': {e}")))
}

/// Every file below `root` whose name matches `include`, in path order.
/// Hidden files and directories are skipped.
fn collect_documents(root: &Path, include: &Regex) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for item in fs::read_dir(&dir)? {
            let path = item?.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if path.is_dir() {
                pending.push(path);
            } else if include.is_match(name) {
                documents.push(path);
            }
        }
    }

    documents.sort();
    Ok(documents)
}

async fn index_documents(engine: &Engine, root: &Path, include: &Regex) -> Result<IndexReport> {
    let start_time = Instant::now();
    let documents = collect_documents(root, include)?;
    let mut report = IndexReport {
        documents: documents.len(),
        ..Default::default()
    };

    for path in &documents {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                report.failed += 1;
                continue;
            }
        };
        let stamp = fs::metadata(path)?
            .modified()
            .ok()
            .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |age| age.as_millis() as u64);

        let id = path.strip_prefix(root).unwrap_or(path).to_string_lossy();
        match engine.index_document(&id, stamp, &content).await {
            IndexOutcome::Indexed => report.indexed += 1,
            IndexOutcome::Failed => report.failed += 1,
            _ => report.skipped += 1,
        }
    }

    report.duration_ms = start_time.elapsed().as_millis() as u64;
    info!(
        "Indexed {} of {} documents under {}",
        report.indexed,
        report.documents,
        root.display()
    );
    Ok(report)
}
