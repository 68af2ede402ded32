//! In-memory search backend
//!
//! Holds a registry of [`InMemoryIndex`]es and executes requests against
//! the snapshots current at the start of each execution.

use crate::collector::collect;
use crate::index::{DocumentWorkExecutor, InMemoryIndex, IndexSnapshot};
use crate::scroll::{IndexOrderScroll, SortedScroll};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sift_core::{Error, IndexSchema, Result};
use sift_query::{BackendScroll, RawSearchResult, SearchBackend, SearchRequest};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info};

/// Name reported by [`InMemoryBackend`]
pub const BACKEND_NAME: &str = "in-memory";

/// Search backend keeping every index in memory
///
/// # Thread Safety
///
/// The registry is a `DashMap`; searches, writes and index creation may run
/// concurrently.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    indexes: DashMap<String, Arc<InMemoryIndex>>,
}

impl InMemoryBackend {
    /// Create a backend without indexes
    pub fn new() -> Self {
        InMemoryBackend::default()
    }

    /// Create an index
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if an index with the same name exists.
    pub fn create_index(&self, schema: IndexSchema) -> Result<Arc<InMemoryIndex>> {
        match self.indexes.entry(schema.name().to_string()) {
            Entry::Occupied(entry) => Err(Error::invalid_input(format!(
                "index '{}' already exists",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                let fields = schema.fields().count();
                let index = Arc::new(InMemoryIndex::new(schema));
                info!(target: "sift::engine", index = index.name(), fields, "Created index");
                entry.insert(Arc::clone(&index));
                Ok(index)
            }
        }
    }

    /// Look up an index
    ///
    /// # Errors
    ///
    /// Returns `UnknownIndex` if no index has that name.
    pub fn index(&self, name: &str) -> Result<Arc<InMemoryIndex>> {
        self.indexes
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::UnknownIndex {
                index: name.to_string(),
            })
    }

    /// Names of every index, sorted
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Executor staging document writes against an index
    pub fn work_executor(&self, name: &str) -> Result<DocumentWorkExecutor> {
        self.index(name).map(DocumentWorkExecutor::new)
    }

    pub(crate) fn snapshots(&self, names: &[String]) -> Result<Vec<Arc<IndexSnapshot>>> {
        names
            .iter()
            .map(|name| self.index(name).map(|index| index.snapshot()))
            .collect()
    }
}

impl SearchBackend for InMemoryBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn schema(&self, index: &str) -> Result<Arc<IndexSchema>> {
        self.index(index).map(|index| Arc::clone(index.schema()))
    }

    fn search(&self, request: &SearchRequest) -> Result<RawSearchResult> {
        let snapshots = self.snapshots(&request.indexes)?;
        collect(&snapshots, request, BACKEND_NAME)
    }

    fn open_scroll(
        &self,
        request: SearchRequest,
        chunk_size: usize,
    ) -> Result<Box<dyn BackendScroll>> {
        let snapshots = self.snapshots(&request.indexes)?;
        debug!(
            target: "sift::engine",
            indexes = ?request.indexes,
            index_order = request.is_index_order(),
            "Opening scroll"
        );
        if request.is_index_order() {
            let scroll = IndexOrderScroll::open(snapshots, request, BACKEND_NAME, chunk_size)?;
            Ok(Box::new(scroll))
        } else {
            let scroll = SortedScroll::open(snapshots, request, BACKEND_NAME, chunk_size)?;
            Ok(Box::new(scroll))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
