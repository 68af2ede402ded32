//! Backend SPI
//!
//! The query pipeline never evaluates predicates itself. A [`SearchBackend`]
//! receives a [`SearchRequest`] rebuilt from the frozen query state on every
//! execution and returns raw hits; everything after that (reference
//! conversion, entity loading, projection) happens in the pipeline.
//!
//! # Contract
//!
//! - `search()` honours `offset`/`limit`, the deadline, and the total-hit
//!   count tracking mode of the request
//! - Under a fail-after deadline, expiration is reported as `Error::Timeout`
//! - Under a truncate-after deadline, expiration returns the hits collected
//!   so far with `timed_out` set and a lower-bound total
//! - `open_scroll()` returns a cursor delivering `chunk_size` hits per call

use crate::predicate::SearchPredicate;
use crate::sort::SearchSort;
use sift_core::{Deadline, Document, DocumentReference, IndexSchema, Result, SearchResultTotal};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Request
// ============================================================================

/// How precisely the backend must count matching documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalHitCountTracking {
    /// Count every match
    Exact,
    /// Count exactly up to the threshold, then a lower bound is enough
    Threshold(u64),
    /// The caller ignores the total; stop as soon as the window is filled
    Skip,
}

/// One execution of a query, as seen by the backend
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Indexes to search
    pub indexes: Vec<String>,
    /// Root predicate
    pub predicate: SearchPredicate,
    /// Sort; `None` means relevance score, descending
    pub sort: Option<SearchSort>,
    /// Number of leading hits to skip
    pub offset: usize,
    /// Maximum number of hits to return; `None` means unbounded
    pub limit: Option<usize>,
    /// Running deadline for this execution
    pub deadline: Option<Deadline>,
    /// Total hit count precision
    pub total_tracking: TotalHitCountTracking,
}

impl SearchRequest {
    /// Position just past the last requested hit, if bounded
    pub fn window_end(&self) -> Option<usize> {
        self.limit.map(|limit| self.offset.saturating_add(limit))
    }

    /// Check if the sort is exactly index order
    pub fn is_index_order(&self) -> bool {
        self.sort.as_ref().map_or(false, SearchSort::is_index_order)
    }
}

// ============================================================================
// Response
// ============================================================================

/// A hit as returned by the backend
#[derive(Debug, Clone)]
pub struct RawHit {
    /// Index and id of the matched document
    pub reference: DocumentReference,
    /// Relevance score (0 for non-scoring predicates)
    pub score: f32,
    /// Stored fields of the matched document
    pub document: Arc<Document>,
}

/// Result of one backend execution
#[derive(Debug, Clone)]
pub struct RawSearchResult {
    /// Hits in the requested window
    pub hits: Vec<RawHit>,
    /// Total matching documents
    pub total: SearchResultTotal,
    /// Time spent in the backend
    pub took: Duration,
    /// Whether a truncate-after deadline cut the execution short
    pub timed_out: bool,
}

impl RawSearchResult {
    /// An empty result with an exact total of zero
    pub fn empty() -> Self {
        RawSearchResult {
            hits: vec![],
            total: SearchResultTotal::exact(0),
            took: Duration::ZERO,
            timed_out: false,
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A storage/indexing engine able to execute search requests
///
/// # Thread Safety
///
/// Backends must be Send + Sync: one backend serves every scope and query.
pub trait SearchBackend: Send + Sync {
    /// Backend name, used in error messages and extension negotiation
    fn name(&self) -> &str;

    /// Schema of an index
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownIndex` if the index does not exist.
    fn schema(&self, index: &str) -> Result<Arc<IndexSchema>>;

    /// Execute a request
    fn search(&self, request: &SearchRequest) -> Result<RawSearchResult>;

    /// Open a scroll over every hit of the request
    ///
    /// `offset` and `limit` of the request are ignored; the request deadline
    /// is ignored too, as each chunk receives its own.
    fn open_scroll(&self, request: SearchRequest, chunk_size: usize)
        -> Result<Box<dyn BackendScroll>>;

    /// Whether the backend honours `TotalHitCountTracking::Threshold`
    fn supports_total_hit_count_threshold(&self) -> bool {
        true
    }

    /// Downcasting hook for backend-specific extensions
    fn as_any(&self) -> &dyn Any;
}

/// Backend side of a scroll
///
/// Not required to be Sync: a scroll is consumed by one caller at a time.
pub trait BackendScroll: Send {
    /// Fetch the next chunk; an empty chunk means the scroll is exhausted
    fn next_chunk(&mut self, deadline: Option<Deadline>) -> Result<RawSearchResult>;

    /// Release backend resources; further calls to `next_chunk` are not allowed
    fn close(&mut self);
}
