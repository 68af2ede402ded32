//! In-memory index with staged writes
//!
//! Writes go through a [`DocumentWorkExecutor`] and are staged until
//! `flush()`, which applies them to a copy of the current snapshot and
//! publishes the result atomically. Searches grab the current
//! `Arc<IndexSnapshot>` once and never observe a half-applied flush.
//!
//! # Index order
//!
//! Documents are kept in insertion order. `add` of an existing id moves the
//! document to the end; `add_or_update` replaces it in place.

use crate::scorer::FieldStats;
use crate::tokenizer::tokenize;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use sift_core::{Document, Error, FieldType, FieldValue, IndexSchema, Result};
use std::sync::Arc;
use tracing::{debug, info};

// ============================================================================
// IndexedDocument
// ============================================================================

/// Token statistics of one text field of one document
#[derive(Debug, Clone, Default)]
pub struct AnalyzedField {
    /// Occurrences per term
    pub term_freqs: FxHashMap<String, u32>,
    /// Number of tokens
    pub len: u32,
}

/// A stored document with its analyzed text fields
#[derive(Debug)]
pub struct IndexedDocument {
    id: String,
    document: Arc<Document>,
    analyzed: FxHashMap<String, AnalyzedField>,
}

impl IndexedDocument {
    fn analyze(schema: &IndexSchema, id: String, document: Document) -> Self {
        let mut analyzed = FxHashMap::default();
        for (path, values) in document.fields() {
            let is_text = schema
                .field(path)
                .map_or(false, |def| def.field_type == FieldType::Text);
            if !is_text {
                continue;
            }
            let mut field = AnalyzedField::default();
            for token in values.iter().filter_map(FieldValue::as_text).flat_map(tokenize) {
                *field.term_freqs.entry(token).or_insert(0) += 1;
                field.len += 1;
            }
            if field.len > 0 {
                analyzed.insert(path.to_string(), field);
            }
        }
        IndexedDocument {
            id,
            document: Arc::new(document),
            analyzed,
        }
    }

    /// Document id, unique within the index
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stored fields
    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// Token statistics of a text field, if it holds any token
    pub fn analyzed(&self, path: &str) -> Option<&AnalyzedField> {
        self.analyzed.get(path)
    }
}

// ============================================================================
// IndexSnapshot
// ============================================================================

/// Immutable view of an index as of one flush
#[derive(Debug)]
pub struct IndexSnapshot {
    schema: Arc<IndexSchema>,
    documents: Vec<Arc<IndexedDocument>>,
    positions: FxHashMap<String, usize>,
    field_stats: FxHashMap<String, FieldStats>,
    generation: u64,
}

impl IndexSnapshot {
    fn empty(schema: Arc<IndexSchema>) -> Self {
        IndexSnapshot {
            schema,
            documents: Vec::new(),
            positions: FxHashMap::default(),
            field_stats: FxHashMap::default(),
            generation: 0,
        }
    }

    fn build(schema: Arc<IndexSchema>, documents: Vec<Arc<IndexedDocument>>, generation: u64) -> Self {
        let mut positions = FxHashMap::default();
        let mut field_stats: FxHashMap<String, FieldStats> = FxHashMap::default();
        for (position, doc) in documents.iter().enumerate() {
            positions.insert(doc.id.clone(), position);
            for (path, field) in &doc.analyzed {
                field_stats
                    .entry(path.clone())
                    .or_default()
                    .add_document(&field.term_freqs, field.len);
            }
        }
        IndexSnapshot {
            schema,
            documents,
            positions,
            field_stats,
            generation,
        }
    }

    /// Index name
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Index schema
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Documents in index order
    pub fn documents(&self) -> &[Arc<IndexedDocument>] {
        &self.documents
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the index holds no document
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Look up a document by id
    pub fn get(&self, id: &str) -> Option<&Arc<IndexedDocument>> {
        self.positions.get(id).map(|&p| &self.documents[p])
    }

    /// Corpus statistics of a text field
    pub fn field_stats(&self, path: &str) -> Option<&FieldStats> {
        self.field_stats.get(path)
    }

    /// Number of flushes that produced this snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ============================================================================
// InMemoryIndex
// ============================================================================

#[derive(Debug)]
enum WorkOperation {
    Add(Arc<IndexedDocument>),
    AddOrUpdate(Arc<IndexedDocument>),
    Delete(String),
}

/// One index of the in-memory backend
///
/// # Thread Safety
///
/// Staging and flushing may happen concurrently with searches; a flush
/// holds the staging lock so two flushes never interleave.
#[derive(Debug)]
pub struct InMemoryIndex {
    schema: Arc<IndexSchema>,
    current: RwLock<Arc<IndexSnapshot>>,
    staged: Mutex<Vec<WorkOperation>>,
}

impl InMemoryIndex {
    pub(crate) fn new(schema: IndexSchema) -> Self {
        let schema = Arc::new(schema);
        InMemoryIndex {
            current: RwLock::new(Arc::new(IndexSnapshot::empty(Arc::clone(&schema)))),
            schema,
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Index name
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Index schema
    pub fn schema(&self) -> &Arc<IndexSchema> {
        &self.schema
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Number of staged, unflushed operations
    pub fn pending(&self) -> usize {
        self.staged.lock().len()
    }

    fn stage(&self, operation: WorkOperation) {
        self.staged.lock().push(operation);
    }

    /// Apply staged operations and publish a new snapshot
    ///
    /// Returns the number of operations applied.
    pub fn flush(&self) -> usize {
        let mut staged = self.staged.lock();
        if staged.is_empty() {
            return 0;
        }
        let operations = std::mem::take(&mut *staged);
        let applied = operations.len();

        let current = self.snapshot();
        let mut slots: Vec<Option<Arc<IndexedDocument>>> =
            current.documents.iter().cloned().map(Some).collect();
        let mut positions = current.positions.clone();

        for operation in operations {
            match operation {
                WorkOperation::Add(doc) => {
                    if let Some(old) = positions.remove(doc.id()) {
                        slots[old] = None;
                    }
                    positions.insert(doc.id.clone(), slots.len());
                    slots.push(Some(doc));
                }
                WorkOperation::AddOrUpdate(doc) => match positions.get(doc.id()) {
                    Some(&position) => slots[position] = Some(doc),
                    None => {
                        positions.insert(doc.id.clone(), slots.len());
                        slots.push(Some(doc));
                    }
                },
                WorkOperation::Delete(id) => {
                    if let Some(old) = positions.remove(&id) {
                        slots[old] = None;
                    }
                }
            }
        }

        let documents: Vec<_> = slots.into_iter().flatten().collect();
        let next = IndexSnapshot::build(
            Arc::clone(&self.schema),
            documents,
            current.generation + 1,
        );
        info!(
            target: "sift::engine",
            index = self.name(),
            applied,
            documents = next.len(),
            generation = next.generation,
            "Flushed index"
        );
        *self.current.write() = Arc::new(next);
        applied
    }
}

// ============================================================================
// DocumentWorkExecutor
// ============================================================================

/// Stages document writes against one index
///
/// Documents are validated against the schema when staged; nothing is
/// visible to searches before `flush()`.
#[derive(Debug, Clone)]
pub struct DocumentWorkExecutor {
    index: Arc<InMemoryIndex>,
}

impl DocumentWorkExecutor {
    pub(crate) fn new(index: Arc<InMemoryIndex>) -> Self {
        DocumentWorkExecutor { index }
    }

    fn prepare<F>(&self, id: &str, populate: F) -> Result<Arc<IndexedDocument>>
    where
        F: FnOnce(&mut Document),
    {
        if id.is_empty() {
            return Err(Error::invalid_input("document id must not be empty"));
        }
        let mut document = Document::new();
        populate(&mut document);
        for (path, values) in document.fields() {
            for value in values {
                self.index.schema.validate_value(path, value)?;
            }
        }
        Ok(Arc::new(IndexedDocument::analyze(
            &self.index.schema,
            id.to_string(),
            document,
        )))
    }

    /// Stage a new document
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the id is empty or a value does not fit its field
    /// - `UnknownField` if the document holds an undeclared field
    pub fn add<F>(&self, id: &str, populate: F) -> Result<()>
    where
        F: FnOnce(&mut Document),
    {
        let doc = self.prepare(id, populate)?;
        self.index.stage(WorkOperation::Add(doc));
        Ok(())
    }

    /// Stage a document, replacing any document with the same id in place
    pub fn add_or_update<F>(&self, id: &str, populate: F) -> Result<()>
    where
        F: FnOnce(&mut Document),
    {
        let doc = self.prepare(id, populate)?;
        self.index.stage(WorkOperation::AddOrUpdate(doc));
        Ok(())
    }

    /// Stage a deletion; deleting an unknown id is a no-op
    pub fn delete(&self, id: &str) {
        debug!(target: "sift::engine", index = self.index.name(), id, "Staged delete");
        self.index.stage(WorkOperation::Delete(id.to_string()));
    }

    /// Publish every staged operation of the index
    pub fn flush(&self) -> usize {
        self.index.flush()
    }
}
