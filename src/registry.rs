//! Process-wide registry of named indices.
//!
//! Each index pairs an HNSW graph with a metadata store and a bounded
//! filter-result cache. The registry owns the name table behind a
//! readers-writer lock: lifecycle operations (create, load, delete) take
//! the exclusive side, everything else resolves the entry under the shared
//! side and then works against the entry's own locks.
//!
//! Lock order is registry, then store, then graph internals. Disk writes
//! go through the exclusive side so a single writer owns the files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::LfuCache;
use crate::constants::{cache, hnsw};
use crate::distance::DistanceMetric;
use crate::error::{QuiverDbError, Result};
use crate::index::HnswIndex;
use crate::metadata::{DataStore, IdSet, Record};
use crate::search::{execute_search, SearchRequest, SearchResponse};
use crate::types::DocId;

/// Construction-time settings of an index, persisted alongside the graph
/// as a JSON sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(rename = "index_name")]
    pub name: String,
    pub dimension: usize,
    #[serde(default = "default_index_type")]
    pub index_type: String,
    #[serde(default = "default_space_type")]
    pub space_type: String,
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    #[serde(rename = "M", default = "default_m")]
    pub m: usize,
}

fn default_index_type() -> String {
    "Approximate".to_string()
}

fn default_space_type() -> String {
    "IP".to_string()
}

fn default_ef_construction() -> usize {
    hnsw::DEFAULT_EF_CONSTRUCTION
}

fn default_m() -> usize {
    hnsw::DEFAULT_M
}

/// A batch of documents to insert.
#[derive(Debug, Clone, Deserialize)]
pub struct AddDocumentsRequest {
    pub index_name: String,
    pub ids: Vec<DocId>,
    pub vectors: Vec<Vec<f32>>,
    /// One record per id, or empty to attach no metadata.
    #[serde(default)]
    pub metadatas: Vec<Record>,
}

/// A stored document: vector plus metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: DocId,
    pub vector: Vec<f32>,
    pub metadata: Record,
}

/// One live index: graph, metadata store, filter cache, settings.
pub(crate) struct IndexEntry {
    pub(crate) settings: IndexSettings,
    pub(crate) ann: RwLock<HnswIndex>,
    pub(crate) store: RwLock<DataStore>,
    pub(crate) filter_cache: Mutex<LfuCache<String, IdSet>>,
}

impl IndexEntry {
    fn new(settings: IndexSettings, ann: HnswIndex, store: DataStore) -> Self {
        Self {
            settings,
            ann: RwLock::new(ann),
            store: RwLock::new(store),
            filter_cache: Mutex::new(LfuCache::new(cache::MAX_FILTER_CACHE_SIZE)),
        }
    }
}

/// Registry of named indices, the public entry point of the crate.
///
/// Constructed once at startup with the directory that holds persisted
/// indices; request handlers borrow it.
pub struct IndexRegistry {
    root: PathBuf,
    entries: RwLock<HashMap<String, Arc<IndexEntry>>>,
}

impl IndexRegistry {
    /// Create a registry persisting under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn graph_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.hnsw"))
    }

    fn settings_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    fn data_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.data"))
    }

    fn entry(&self, name: &str) -> Result<Arc<IndexEntry>> {
        self.entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| QuiverDbError::index_not_found(name))
    }

    /// Create a new in-memory index from `settings`.
    pub fn create_index(&self, settings: IndexSettings) -> Result<()> {
        validate_index_name(&settings.name)?;
        if settings.dimension == 0 {
            return Err(QuiverDbError::bad_request("dimension must be non-zero"));
        }
        let metric = DistanceMetric::from_space_type(&settings.space_type)?;

        let mut entries = self.entries.write();
        if entries.contains_key(&settings.name) {
            return Err(QuiverDbError::IndexAlreadyExists(settings.name));
        }

        let ann = HnswIndex::new(
            settings.dimension,
            settings.m,
            settings.ef_construction,
            metric,
            hnsw::DEFAULT_CAPACITY,
        );
        let name = settings.name.clone();
        entries.insert(
            name.clone(),
            Arc::new(IndexEntry::new(settings, ann, DataStore::new())),
        );

        info!(index = %name, "index created");
        Ok(())
    }

    /// Load a previously saved index from disk.
    pub fn load_index(&self, name: &str) -> Result<()> {
        validate_index_name(name)?;

        let mut entries = self.entries.write();
        if entries.contains_key(name) {
            return Err(QuiverDbError::IndexAlreadyExists(name.to_string()));
        }

        let settings: IndexSettings =
            serde_json::from_str(&fs::read_to_string(self.settings_path(name))?)?;
        let ann = HnswIndex::load(self.graph_path(name))?;
        let store = DataStore::deserialize(self.data_path(name))?;

        entries.insert(
            name.to_string(),
            Arc::new(IndexEntry::new(settings, ann, store)),
        );

        info!(index = %name, "index loaded from disk");
        Ok(())
    }

    /// Persist an index: graph snapshot, settings sidecar, metadata store.
    pub fn save_index(&self, name: &str) -> Result<()> {
        // Exclusive registry side: one disk writer at a time
        let entries = self.entries.write();
        let entry = entries
            .get(name)
            .ok_or_else(|| QuiverDbError::index_not_found(name))?;

        fs::create_dir_all(&self.root)?;
        entry.ann.read().save(self.graph_path(name))?;
        entry.store.read().serialize(self.data_path(name))?;
        fs::write(
            self.settings_path(name),
            serde_json::to_string_pretty(&entry.settings)?,
        )?;

        info!(index = %name, "index saved to disk");
        Ok(())
    }

    /// Drop an index from memory. On-disk files are untouched.
    pub fn delete_index(&self, name: &str) -> Result<()> {
        match self.entries.write().remove(name) {
            Some(_) => {
                info!(index = %name, "index deleted from memory");
                Ok(())
            }
            None => Err(QuiverDbError::index_not_found(name)),
        }
    }

    /// Remove an index's files from disk. Refused while the index is
    /// loaded, so a live index can never lose its backing files.
    pub fn delete_index_from_disk(&self, name: &str) -> Result<()> {
        validate_index_name(name)?;

        let entries = self.entries.write();
        if entries.contains_key(name) {
            return Err(QuiverDbError::IndexLoaded(name.to_string()));
        }

        for path in [
            self.graph_path(name),
            self.settings_path(name),
            self.data_path(name),
        ] {
            remove_file_if_exists(&path)?;
        }

        info!(index = %name, "index deleted from disk");
        Ok(())
    }

    /// Names of all loaded indices, sorted.
    pub fn list_indices(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Liveness probe for the transport layer.
    pub fn health(&self) -> &'static str {
        "OK"
    }

    /// Insert a batch of documents into an index.
    ///
    /// Non-transactional: if an insert fails mid-batch, prior documents
    /// stay committed. The filter cache is cleared before any document
    /// lands, since a write can change any cached result.
    pub fn add_documents(&self, req: AddDocumentsRequest) -> Result<()> {
        if req.ids.len() != req.vectors.len() {
            return Err(QuiverDbError::bad_request(
                "number of ids does not match number of vectors",
            ));
        }
        if !req.metadatas.is_empty() && req.metadatas.len() != req.ids.len() {
            return Err(QuiverDbError::bad_request(
                "number of metadatas does not match number of ids",
            ));
        }

        let entry = self.entry(&req.index_name)?;

        {
            let mut filter_cache = entry.filter_cache.lock();
            if !filter_cache.is_empty() {
                filter_cache.clear();
            }
        }

        // One lock scope for the whole batch (store before graph): a
        // concurrent search sees all of it or none of it, and the
        // capacity check below sizes against a node count no other
        // writer can move before this batch lands.
        let mut store = entry.store.write();
        let mut ann = entry.ann.write();

        if ann.node_count() + req.ids.len() + hnsw::RESIZE_HEADROOM > ann.capacity() {
            let current = ann.capacity();
            let new_capacity =
                (current as f64 + current as f64 * hnsw::GROWTH_FACTOR) as usize + req.ids.len();
            warn!(from = current, to = new_capacity, "resizing index");
            ann.resize(new_capacity);
        }

        for (i, &id) in req.ids.iter().enumerate() {
            ann.add(id, &req.vectors[i])?;
            let record = req.metadatas.get(i).cloned().unwrap_or_default();
            store.set(id, record);
        }

        debug!(index = %req.index_name, count = req.ids.len(), "documents added");
        Ok(())
    }

    /// Delete documents by id: tombstone the graph nodes and remove the
    /// records, keeping the NOT universal set consistent. Absent ids are
    /// skipped. The filter cache is cleared so no stale result can
    /// resurrect a deleted id.
    pub fn delete_documents(&self, index_name: &str, ids: &[DocId]) -> Result<()> {
        let entry = self.entry(index_name)?;

        {
            let mut store = entry.store.write();
            let mut ann = entry.ann.write();
            for &id in ids {
                ann.mark_delete(id);
                store.remove(id);
            }
        }
        entry.filter_cache.lock().clear();

        debug!(index = %index_name, count = ids.len(), "documents deleted");
        Ok(())
    }

    /// Fetch one document: its vector and its metadata.
    pub fn get_document(&self, index_name: &str, id: DocId) -> Result<Document> {
        let entry = self.entry(index_name)?;
        let metadata = entry.store.read().get(id)?;
        let vector = entry.ann.read().get_vector(id)?;
        Ok(Document {
            id,
            vector,
            metadata,
        })
    }

    /// Run a search request against its index.
    pub fn search(&self, req: &SearchRequest) -> Result<SearchResponse> {
        let entry = self.entry(&req.index_name)?;
        execute_search(&entry, req)
    }
}

fn validate_index_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(QuiverDbError::bad_request("index name must be non-empty"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(QuiverDbError::bad_request(format!(
            "invalid index name: {name}"
        )));
    }
    Ok(())
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(name: &str, dim: usize) -> IndexSettings {
        IndexSettings {
            name: name.to_string(),
            dimension: dim,
            index_type: default_index_type(),
            space_type: "L2".to_string(),
            ef_construction: 128,
            m: 8,
        }
    }

    #[test]
    fn test_create_conflict() {
        let registry = IndexRegistry::new("target/test-registry-unused");
        registry.create_index(settings("a", 4)).unwrap();
        assert!(matches!(
            registry.create_index(settings("a", 4)),
            Err(QuiverDbError::IndexAlreadyExists(_))
        ));
    }

    #[test]
    fn test_list_is_sorted() {
        let registry = IndexRegistry::new("target/test-registry-unused");
        registry.create_index(settings("b", 4)).unwrap();
        registry.create_index(settings("a", 4)).unwrap();
        assert_eq!(registry.list_indices(), vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let registry = IndexRegistry::new("target/test-registry-unused");
        assert!(registry.create_index(settings("", 4)).is_err());
        assert!(registry.create_index(settings("../escape", 4)).is_err());
        assert!(registry.create_index(settings("a/b", 4)).is_err());
    }

    #[test]
    fn test_settings_defaults_from_json() {
        let parsed: IndexSettings =
            serde_json::from_str(r#"{"index_name": "items", "dimension": 64}"#).unwrap();
        assert_eq!(parsed.name, "items");
        assert_eq!(parsed.index_type, "Approximate");
        assert_eq!(parsed.space_type, "IP");
        assert_eq!(parsed.ef_construction, 512);
        assert_eq!(parsed.m, 16);
    }

    #[test]
    fn test_add_documents_length_validation() {
        let registry = IndexRegistry::new("target/test-registry-unused");
        registry.create_index(settings("idx", 2)).unwrap();

        let req = AddDocumentsRequest {
            index_name: "idx".into(),
            ids: vec![1, 2],
            vectors: vec![vec![0.0, 0.0]],
            metadatas: vec![],
        };
        assert!(matches!(
            registry.add_documents(req),
            Err(QuiverDbError::BadRequest(_))
        ));
    }

    #[test]
    fn test_unknown_index_errors() {
        let registry = IndexRegistry::new("target/test-registry-unused");
        assert!(matches!(
            registry.delete_index("ghost"),
            Err(QuiverDbError::IndexNotFound(_))
        ));
        assert!(matches!(
            registry.get_document("ghost", 1),
            Err(QuiverDbError::IndexNotFound(_))
        ));
    }
}
