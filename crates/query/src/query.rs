//! Executable query and fetch variants
//!
//! A [`SearchQuery`] is immutable once compiled. Every fetch call builds its
//! own [`SearchRequest`] from the frozen state, so windowing applied by one
//! call never leaks into the next, and asks the loading context for a fresh
//! hit mapper.

use crate::backend::{SearchRequest, TotalHitCountTracking};
use crate::extension::{negotiate, SearchExtension};
use crate::loading::LoadingContext;
use crate::mapping::map_hits;
use crate::predicate::SearchPredicate;
use crate::projection::SearchProjection;
use crate::scope::SearchScope;
use crate::scroll::SearchScroll;
use crate::sort::SearchSort;
use sift_core::{Error, Result, SearchResultTotal, TimeoutPolicy};
use std::time::{Duration, Instant};
use tracing::debug;

// ============================================================================
// SearchResult
// ============================================================================

/// Hits of one fetch, with total count and timing
#[derive(Debug, Clone)]
pub struct SearchResult<P> {
    hits: Vec<P>,
    total: SearchResultTotal,
    took: Duration,
    timed_out: bool,
}

impl<P> SearchResult<P> {
    /// Hits in the requested window, in result order
    pub fn hits(&self) -> &[P] {
        &self.hits
    }

    /// Take ownership of the hits
    pub fn into_hits(self) -> Vec<P> {
        self.hits
    }

    /// Total number of matching documents
    pub fn total(&self) -> &SearchResultTotal {
        &self.total
    }

    /// Time spent executing, loading included
    pub fn took(&self) -> Duration {
        self.took
    }

    /// Whether a truncate-after timeout cut the execution short
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

// ============================================================================
// SearchQuery
// ============================================================================

/// A compiled query, executable any number of times
pub struct SearchQuery<C: LoadingContext, P> {
    scope: SearchScope,
    predicate: SearchPredicate,
    sort: Option<SearchSort>,
    timeout: Option<TimeoutPolicy>,
    total_hit_count_threshold: Option<u64>,
    projection: SearchProjection<C::Reference, C::Entity, P>,
    loading: C,
}

impl<C: LoadingContext, P> std::fmt::Debug for SearchQuery<C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchQuery")
            .field("scope", &self.scope)
            .field("predicate", &self.predicate)
            .field("sort", &self.sort)
            .field("timeout", &self.timeout)
            .field("total_hit_count_threshold", &self.total_hit_count_threshold)
            .finish()
    }
}

impl<C: LoadingContext, P: Send + 'static> SearchQuery<C, P> {
    pub(crate) fn new(
        scope: SearchScope,
        predicate: SearchPredicate,
        sort: Option<SearchSort>,
        timeout: Option<TimeoutPolicy>,
        total_hit_count_threshold: Option<u64>,
        projection: SearchProjection<C::Reference, C::Entity, P>,
        loading: C,
    ) -> Self {
        SearchQuery {
            scope,
            predicate,
            sort,
            timeout,
            total_hit_count_threshold,
            projection,
            loading,
        }
    }

    /// Scope the query runs against
    pub fn scope(&self) -> &SearchScope {
        &self.scope
    }

    /// Root predicate
    pub fn predicate(&self) -> &SearchPredicate {
        &self.predicate
    }

    /// Sort, if one was set
    pub fn sort(&self) -> Option<&SearchSort> {
        self.sort.as_ref()
    }

    /// Timeout policy, if one was set or configured
    pub fn timeout(&self) -> Option<TimeoutPolicy> {
        self.timeout
    }

    /// Total hit count threshold, if one was set or configured
    pub fn total_hit_count_threshold(&self) -> Option<u64> {
        self.total_hit_count_threshold
    }

    /// Loading context built at `to_query()`
    pub fn loading_context(&self) -> &C {
        &self.loading
    }

    /// Projection applied to every hit
    pub fn projection(&self) -> &SearchProjection<C::Reference, C::Entity, P> {
        &self.projection
    }

    fn default_tracking(&self) -> TotalHitCountTracking {
        match self.total_hit_count_threshold {
            Some(threshold) => TotalHitCountTracking::Threshold(threshold),
            None => TotalHitCountTracking::Exact,
        }
    }

    pub(crate) fn request(
        &self,
        offset: usize,
        limit: Option<usize>,
        total_tracking: TotalHitCountTracking,
    ) -> SearchRequest {
        SearchRequest {
            indexes: self.scope.indexes().to_vec(),
            predicate: self.predicate.clone(),
            sort: self.sort.clone(),
            offset,
            limit,
            deadline: self.timeout.map(|t| t.start()),
            total_tracking,
        }
    }

    fn check_window(&self, offset: usize, limit: Option<usize>) -> Result<()> {
        let Some(limit) = limit else {
            return Ok(());
        };
        let max = self.scope.config().max_result_window;
        match offset.checked_add(limit) {
            Some(end) if end <= max => Ok(()),
            _ => Err(Error::WindowTooLarge { offset, limit, max }),
        }
    }

    fn execute(
        &self,
        offset: usize,
        limit: Option<usize>,
        total_tracking: TotalHitCountTracking,
    ) -> Result<SearchResult<P>> {
        let started = Instant::now();
        let request = self.request(offset, limit, total_tracking);
        let raw = self.scope.backend().search(&request)?;
        let hits = map_hits(
            &self.projection,
            &self.loading,
            &raw.hits,
            request.deadline.as_ref(),
        )?;
        let took = started.elapsed();

        debug!(
            target: "sift::query",
            offset,
            limit = ?limit,
            hits = hits.len(),
            total = raw.total.hit_count_lower_bound(),
            exact = raw.total.is_hit_count_exact(),
            timed_out = raw.timed_out,
            took_us = took.as_micros() as u64,
            "Executed search"
        );

        Ok(SearchResult {
            hits,
            total: raw.total,
            took,
            timed_out: raw.timed_out,
        })
    }

    /// Fetch every hit
    pub fn fetch_all(&self) -> Result<SearchResult<P>> {
        self.fetch(None, None)
    }

    /// Fetch a window of hits
    ///
    /// `offset` defaults to 0 and `limit` to unbounded. A window starting
    /// past the last hit returns no hits and the full total.
    ///
    /// # Errors
    ///
    /// - `WindowTooLarge` if `offset + limit` exceeds `max_result_window`
    /// - `Timeout` under a fail-after policy
    pub fn fetch(&self, offset: Option<usize>, limit: Option<usize>) -> Result<SearchResult<P>> {
        let offset = offset.unwrap_or(0);
        self.check_window(offset, limit)?;
        self.execute(offset, limit, self.default_tracking())
    }

    /// Fetch a window of hits without computing the total
    pub fn fetch_hits(&self, offset: Option<usize>, limit: Option<usize>) -> Result<Vec<P>> {
        let offset = offset.unwrap_or(0);
        self.check_window(offset, limit)?;
        self.execute(offset, limit, TotalHitCountTracking::Skip)
            .map(SearchResult::into_hits)
    }

    /// Count matching documents, regardless of any window used by other calls
    ///
    /// Under a truncate-after policy an expired count returns the number of
    /// matches found so far.
    pub fn fetch_total_hit_count(&self) -> Result<u64> {
        let request = self.request(0, Some(0), TotalHitCountTracking::Exact);
        let raw = self.scope.backend().search(&request)?;
        if raw.timed_out {
            debug!(
                target: "sift::query",
                lower_bound = raw.total.hit_count_lower_bound(),
                "Hit count truncated by timeout"
            );
            return Ok(raw.total.hit_count_lower_bound());
        }
        raw.total.hit_count()
    }

    /// Fetch the only matching hit
    ///
    /// Two hits are requested to detect a second match, so the window
    /// `[0, 2)` must fit `max_result_window`.
    ///
    /// # Errors
    ///
    /// - `NonUniqueHit` if more than one document matches
    /// - `WindowTooLarge` if `max_result_window` is below 2
    /// - loading context errors such as `SessionClosed`
    pub fn fetch_single_hit(&self) -> Result<Option<P>> {
        self.check_window(0, Some(2))?;
        let request = self.request(0, Some(2), TotalHitCountTracking::Skip);
        let raw = self.scope.backend().search(&request)?;
        // mapping first so the loading context is consulted on every execution
        let hits = map_hits(
            &self.projection,
            &self.loading,
            &raw.hits,
            request.deadline.as_ref(),
        )?;
        if raw.hits.len() > 1 {
            return Err(Error::NonUniqueHit {
                count: raw.hits.len(),
            });
        }
        Ok(hits.into_iter().next())
    }

    /// Iterate over every hit in chunks of `chunk_size`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `chunk_size` is zero.
    pub fn scroll(&self, chunk_size: usize) -> Result<SearchScroll<'_, C, P>> {
        if chunk_size == 0 {
            return Err(Error::invalid_input("scroll chunk size must be positive"));
        }
        let request = self.request(0, None, self.default_tracking());
        let handle = self.scope.backend().open_scroll(request, chunk_size)?;
        Ok(SearchScroll::new(self, handle, chunk_size))
    }

    /// Negotiate a backend-specific query
    pub fn extension<X>(self, extension: &X) -> Result<X::Extended>
    where
        X: SearchExtension<Self>,
    {
        let backend = self.scope.backend().clone();
        negotiate(extension, self, backend.as_ref())
    }
}
