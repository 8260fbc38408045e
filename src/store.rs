use crate::error::StoreError;
use crate::models::{ListingId, ListingRecord};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Table every document lives in; matches the layout TinyDB writes
const DEFAULT_TABLE: &str = "_default";

/// Append-only JSON document store keyed by listing identifier.
///
/// On disk: `{"_default": {"1": {...}, "2": {...}}}`. Every insert rewrites the file
/// through a temp file and rename, so a crash leaves either the old or the new file.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    documents: BTreeMap<u64, Value>,
}

impl JsonStore {
    /// Open the store at `path`, creating an empty one if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No store found. Starting fresh.");
                let store = Self {
                    path,
                    documents: BTreeMap::new(),
                };
                store.persist()?;
                return Ok(store);
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let documents = parse_documents(&path, &raw)?;
        info!(path = %path.display(), documents = documents.len(), "Store loaded");
        Ok(Self { path, documents })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Every stored listing, in insertion order. Documents that are not listing records
    /// are skipped with a warning.
    pub fn all(&self) -> Vec<ListingRecord> {
        self.documents
            .iter()
            .filter_map(|(doc_id, doc)| {
                match serde_json::from_value::<ListingRecord>(doc.clone()) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(doc_id, "Skipping document that is not a listing record: {e}");
                        None
                    }
                }
            })
            .collect()
    }

    /// Identifiers of every stored document. Only `target` is read, so documents from
    /// older runs with a narrower field set still count as cached.
    pub fn identifiers(&self) -> HashSet<ListingId> {
        self.documents
            .values()
            .filter_map(|doc| doc.get("target").cloned())
            .filter_map(|target| serde_json::from_value::<ListingId>(target).ok())
            .collect()
    }

    /// Append a record and make it durable before returning
    pub fn insert(&mut self, record: &ListingRecord) -> Result<u64, StoreError> {
        let doc = serde_json::to_value(record)
            .map_err(|e| StoreError::Encode(record.target.clone(), e))?;
        let doc_id = self.documents.keys().next_back().map_or(1, |last| last + 1);
        self.documents.insert(doc_id, doc);

        if let Err(e) = self.persist() {
            self.documents.remove(&doc_id);
            return Err(e);
        }
        debug!(doc_id, listing = %record.target, "Record stored");
        Ok(doc_id)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let table: Map<String, Value> = self
            .documents
            .iter()
            .map(|(id, doc)| (id.to_string(), doc.clone()))
            .collect();
        let mut root = Map::new();
        root.insert(DEFAULT_TABLE.to_string(), Value::Object(table));

        let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, &root).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
            writer.flush().map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

fn parse_documents(path: &Path, raw: &str) -> Result<BTreeMap<u64, Value>, StoreError> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let corrupt = |source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    };

    let mut tables: Map<String, Value> = serde_json::from_str(raw).map_err(corrupt)?;
    let Some(table) = tables.remove(DEFAULT_TABLE) else {
        return Ok(BTreeMap::new());
    };
    let table: Map<String, Value> = serde_json::from_value(table).map_err(corrupt)?;

    let mut documents = BTreeMap::new();
    for (key, doc) in table {
        match key.parse::<u64>() {
            Ok(doc_id) => {
                documents.insert(doc_id, doc);
            }
            Err(_) => warn!(key, "Ignoring document with a non-numeric id"),
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Fragment, ListingDraft};
    use tempfile::TempDir;

    fn record(id: &str) -> ListingRecord {
        let mut draft = ListingDraft::new(ListingId::new(id).unwrap());
        draft.merge(Fragment::Images(vec![format!("https://img/{id}.jpg")]));
        draft.finish()
    }

    #[test]
    fn open_creates_an_empty_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("rooms.json");

        let store = JsonStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"_default":{}}"#);
    }

    #[test]
    fn inserts_survive_reopening() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rooms.json");

        let mut store = JsonStore::open(&path).unwrap();
        assert_eq!(store.insert(&record("1")).unwrap(), 1);
        assert_eq!(store.insert(&record("2")).unwrap(), 2);

        let reopened = JsonStore::open(&path).unwrap();
        let all = reopened.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], record("1"));
        assert_eq!(all[1].target.as_str(), "2");
    }

    #[test]
    fn identifiers_read_legacy_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rooms.json");
        fs::write(
            &path,
            r#"{"_default": {"1": {"target": 12345, "lat": "NA", "lng": "NA"}, "2": {"target": "67890"}}}"#,
        )
        .unwrap();

        let store = JsonStore::open(&path).unwrap();
        let ids = store.identifiers();
        assert!(ids.contains(&ListingId::new("12345").unwrap()));
        assert!(ids.contains(&ListingId::new("67890").unwrap()));
        assert!(store.all().is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rooms.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            JsonStore::open(&path),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
