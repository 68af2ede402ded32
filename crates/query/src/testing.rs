//! Stub backend for unit tests
//!
//! Evaluates only `MatchAll` and `Id` predicates (everything else matches
//! every document), ignores sorts, and always counts exactly.

use crate::backend::{BackendScroll, RawHit, RawSearchResult, SearchBackend, SearchRequest};
use crate::predicate::SearchPredicate;
use crate::scope::SearchScope;
use parking_lot::Mutex;
use sift_core::{
    Deadline, Document, DocumentReference, Error, FieldDefinition, IndexSchema, Result,
    SearchConfig, SearchResultTotal,
};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn books_schema() -> IndexSchema {
    IndexSchema::builder("books")
        .field("title", FieldDefinition::text())
        .field("summary", FieldDefinition::text())
        .field("isbn", FieldDefinition::keyword().not_projectable())
        .field("pages", FieldDefinition::integer().sortable())
        .field("rating", FieldDefinition::double().sortable())
        .field("genre", FieldDefinition::keyword().sortable())
        .field("available", FieldDefinition::boolean())
        .field("location", FieldDefinition::geo_point().sortable())
        .field("author.name", FieldDefinition::text())
        .field("author.born", FieldDefinition::integer())
        .build()
        .unwrap()
}

pub(crate) struct StubBackend {
    schema: Arc<IndexSchema>,
    documents: Vec<(String, Arc<Document>)>,
    threshold_support: bool,
    requests: Arc<Mutex<Vec<SearchRequest>>>,
    closed_scrolls: Arc<AtomicUsize>,
}

impl StubBackend {
    pub(crate) fn books() -> Self {
        StubBackend {
            schema: Arc::new(books_schema()),
            documents: Vec::new(),
            threshold_support: true,
            requests: Arc::new(Mutex::new(Vec::new())),
            closed_scrolls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn numbered(count: usize) -> Self {
        let mut backend = Self::books();
        for i in 0..count {
            let mut doc = Document::new();
            doc.add("pages", i as i64);
            backend.documents.push((i.to_string(), Arc::new(doc)));
        }
        backend
    }

    pub(crate) fn without_threshold_support(mut self) -> Self {
        self.threshold_support = false;
        self
    }

    pub(crate) fn requests(&self) -> Arc<Mutex<Vec<SearchRequest>>> {
        Arc::clone(&self.requests)
    }

    pub(crate) fn closed_scrolls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closed_scrolls)
    }

    pub(crate) fn into_scope(self) -> SearchScope {
        SearchScope::new(Arc::new(self), &["books"]).unwrap()
    }

    fn matching(&self, predicate: &SearchPredicate) -> Vec<RawHit> {
        self.documents
            .iter()
            .filter(|(id, _)| match predicate {
                SearchPredicate::Id { ids } => ids.contains(id),
                _ => true,
            })
            .map(|(id, doc)| RawHit {
                reference: DocumentReference::new("books", id.as_str()),
                score: 1.0,
                document: Arc::clone(doc),
            })
            .collect()
    }
}

impl SearchBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn schema(&self, index: &str) -> Result<Arc<IndexSchema>> {
        if index == self.schema.name() {
            Ok(Arc::clone(&self.schema))
        } else {
            Err(Error::UnknownIndex {
                index: index.to_string(),
            })
        }
    }

    fn search(&self, request: &SearchRequest) -> Result<RawSearchResult> {
        self.requests.lock().push(request.clone());
        let all = self.matching(&request.predicate);
        let total = SearchResultTotal::exact(all.len() as u64);
        let hits = all
            .into_iter()
            .skip(request.offset)
            .take(request.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(RawSearchResult {
            hits,
            total,
            took: Duration::ZERO,
            timed_out: false,
        })
    }

    fn open_scroll(
        &self,
        request: SearchRequest,
        chunk_size: usize,
    ) -> Result<Box<dyn BackendScroll>> {
        Ok(Box::new(StubScroll {
            hits: self.matching(&request.predicate),
            position: 0,
            chunk_size,
            closed: Arc::clone(&self.closed_scrolls),
        }))
    }

    fn supports_total_hit_count_threshold(&self) -> bool {
        self.threshold_support
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct StubScroll {
    hits: Vec<RawHit>,
    position: usize,
    chunk_size: usize,
    closed: Arc<AtomicUsize>,
}

impl BackendScroll for StubScroll {
    fn next_chunk(&mut self, _deadline: Option<Deadline>) -> Result<RawSearchResult> {
        let end = (self.position + self.chunk_size).min(self.hits.len());
        let hits = self.hits[self.position..end].to_vec();
        self.position = end;
        Ok(RawSearchResult {
            hits,
            total: SearchResultTotal::exact(self.hits.len() as u64),
            took: Duration::ZERO,
            timed_out: false,
        })
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn book_scope() -> SearchScope {
    StubBackend::books().into_scope()
}

pub(crate) fn book_scope_with(config: SearchConfig) -> SearchScope {
    SearchScope::with_config(Arc::new(StubBackend::books()), &["books"], config).unwrap()
}

pub(crate) fn numbered_scope(count: usize) -> SearchScope {
    StubBackend::numbered(count).into_scope()
}
