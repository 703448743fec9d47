use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Record, StateBackend, StateKey, StoreError};

const DOCUMENT_VERSION: u32 = 1;

/// On-disk layout: base identifier -> field kind -> record
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, BTreeMap<String, Record>>,
}

/// Single JSON document on disk, read lazily on first access and rewritten
/// through a temp file + rename on every upsert.
pub struct JsonFileBackend {
    path: PathBuf,
    doc: Option<Document>,
}

impl JsonFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), doc: None }
    }

    /// Loads the document once. A missing file is an empty document; a
    /// corrupt one is reported once and then treated as empty. An I/O error
    /// leaves nothing loaded, so the next access retries the read.
    fn ensure_loaded(&mut self) -> Result<(), StoreError> {
        if self.doc.is_some() {
            return Ok(());
        }
        match read_document(&self.path) {
            Ok(doc) => {
                self.doc = Some(doc);
                Ok(())
            }
            Err(e @ StoreError::Json { .. }) => {
                self.doc = Some(Document::default());
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

impl StateBackend for JsonFileBackend {
    fn name(&self) -> &str { "json" }

    fn load(&mut self, key: &StateKey) -> Result<Option<Record>, StoreError> {
        self.ensure_loaded()?;
        Ok(self
            .doc
            .as_ref()
            .and_then(|doc| doc.entries.get(&key.base))
            .and_then(|fields| fields.get(key.field.as_str()))
            .cloned())
    }

    fn upsert(&mut self, key: &StateKey, record: &Record) -> Result<(), StoreError> {
        match self.ensure_loaded() {
            Ok(()) => {}
            Err(e @ StoreError::Json { .. }) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Replacing corrupt state document");
            }
            // rewriting from a partial view would drop every other key
            Err(e) => return Err(e),
        }
        let doc = self.doc.get_or_insert_with(Document::default);
        doc.version = DOCUMENT_VERSION;
        doc.entries
            .entry(key.base.clone())
            .or_default()
            .insert(key.field.as_str().to_string(), record.clone());
        write_document(&self.path, doc)
    }
}

fn read_document(path: &Path) -> Result<Document, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::default()),
        Err(source) => return Err(StoreError::Io { path: path.to_path_buf(), source }),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::default());
    }
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json { path: path.to_path_buf(), source })
}

fn write_document(path: &Path, doc: &Document) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let bytes = serde_json::to_vec(doc).map_err(|source| StoreError::Json { path: path.to_path_buf(), source })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)
}
