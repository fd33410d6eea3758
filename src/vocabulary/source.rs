//! Vocabulary sources: where word records are loaded from and written back to.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;

use crate::error::{GlossaError, Result};
use crate::vocabulary::definition::WordRecord;

/// One change written back to a source, keyed by node id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Create(WordRecord),
    Update(WordRecord),
    Delete { node_id: String },
}

impl WriteOp {
    pub fn node_id(&self) -> &str {
        match self {
            WriteOp::Create(record) | WriteOp::Update(record) => &record.node_id,
            WriteOp::Delete { node_id } => node_id,
        }
    }
}

/// Apply `ops` to a source's record list in order.
///
/// Creating an existing node replaces it and updating a missing node creates
/// it.
pub fn apply_ops(records: &mut Vec<WordRecord>, ops: &[WriteOp]) {
    for op in ops {
        match op {
            WriteOp::Create(record) | WriteOp::Update(record) => {
                match records.iter_mut().find(|r| r.node_id == record.node_id) {
                    Some(existing) => *existing = record.clone(),
                    None => records.push(record.clone()),
                }
            }
            WriteOp::Delete { node_id } => records.retain(|r| &r.node_id != node_id),
        }
    }
}

/// Storage behind the vocabulary.
#[async_trait]
pub trait VocabularySource: Send + Sync {
    /// Every source id with its records, in source order.
    async fn load(&self) -> Result<BTreeMap<String, Vec<WordRecord>>>;

    /// Persist a batch of changes to one source.
    async fn apply(&self, source_id: &str, ops: Vec<WriteOp>) -> Result<()>;

    /// Name of this source (for logs).
    fn name(&self) -> &'static str;
}

/// In-memory source, mostly for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemorySource {
    sources: Mutex<BTreeMap<String, Vec<WordRecord>>>,
    batches: Mutex<Vec<(String, Vec<WriteOp>)>>,
    failing: AtomicBool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a source with records.
    pub fn with_source<S: Into<String>>(self, source_id: S, records: Vec<WordRecord>) -> Self {
        self.sources.lock().insert(source_id.into(), records);
        self
    }

    /// Make every following `apply` fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Batches received by `apply`, in order.
    pub fn batches(&self) -> Vec<(String, Vec<WriteOp>)> {
        self.batches.lock().clone()
    }

    pub fn records(&self, source_id: &str) -> Vec<WordRecord> {
        self.sources
            .lock()
            .get(source_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl VocabularySource for MemorySource {
    async fn load(&self) -> Result<BTreeMap<String, Vec<WordRecord>>> {
        Ok(self.sources.lock().clone())
    }

    async fn apply(&self, source_id: &str, ops: Vec<WriteOp>) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GlossaError::source(format!(
                "source '{source_id}' rejected {} changes",
                ops.len()
            )));
        }
        apply_ops(
            self.sources.lock().entry(source_id.to_string()).or_default(),
            &ops,
        );
        self.batches.lock().push((source_id.to_string(), ops));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Source ids name files, so they may not contain path separators or start
/// with a dot.
fn is_valid_source_id(source_id: &str) -> bool {
    !source_id.is_empty()
        && !source_id.starts_with('.')
        && source_id
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '))
}

/// A directory of `<source-id>.json` files, each holding an array of records.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    directory: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        JsonFileSource {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn source_path(&self, source_id: &str) -> Result<PathBuf> {
        if !is_valid_source_id(source_id) {
            return Err(GlossaError::source(format!(
                "invalid source id '{source_id}'"
            )));
        }
        Ok(self.directory.join(format!("{source_id}.json")))
    }

    async fn read_records(path: &Path) -> Result<Vec<WordRecord>> {
        let bytes = tokio::fs::read(path).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            GlossaError::source(format!("failed to parse {}: {e}", path.display()))
        })
    }
}

#[async_trait]
impl VocabularySource for JsonFileSource {
    async fn load(&self) -> Result<BTreeMap<String, Vec<WordRecord>>> {
        let mut sources = BTreeMap::new();
        let mut dir = tokio::fs::read_dir(&self.directory).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(source_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !is_valid_source_id(source_id) {
                debug!("Skipping vocabulary file {}", path.display());
                continue;
            }
            let records = Self::read_records(&path).await?;
            debug!("Loaded {} records from {}", records.len(), path.display());
            sources.insert(source_id.to_string(), records);
        }
        Ok(sources)
    }

    async fn apply(&self, source_id: &str, ops: Vec<WriteOp>) -> Result<()> {
        let path = self.source_path(source_id)?;
        let mut records = if tokio::fs::try_exists(&path).await? {
            Self::read_records(&path).await?
        } else {
            Vec::new()
        };
        apply_ops(&mut records, &ops);

        let json = serde_json::to_vec_pretty(&records)?;
        let temp_path = self.directory.join(format!(".{source_id}.json.tmp"));
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &path).await?;
        debug!(
            "Wrote {} changes to {} ({} records)",
            ops.len(),
            path.display(),
            records.len()
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}
