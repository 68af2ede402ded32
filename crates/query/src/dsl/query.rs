//! Query step chain
//!
//! ```text
//! SearchScope::query()
//!   └─▶ SearchQuerySelectStep ──select*()──▶ SearchQueryWhereStep ──where_()──▶ SearchQueryOptionsStep
//!              │                                                                   │
//!              └──────────── where_() (selects entities) ─────────────────────────▶│
//!                                                                                  ▼
//!                                                                    to_query() ─▶ SearchQuery
//! ```
//!
//! Each step is consumed by the next call. Selection happens once: the options
//! step has no `select*` method.

use super::predicate::{PredicateFinalStep, SearchPredicateFactory};
use super::projection::{ProjectionFinalStep, SearchProjectionFactory};
use super::sort::{SearchSortFactory, SortFinalStep};
use crate::extension::{negotiate, SearchExtension};
use crate::loading::{EntityOf, LoadingContextBuilder, ReferenceOf};
use crate::predicate::SearchPredicate;
use crate::projection::SearchProjection;
use crate::query::{SearchQuery, SearchResult};
use crate::scope::SearchScope;
use crate::sort::SearchSort;
use sift_core::{Error, Result, TimeoutPolicy};
use std::time::Duration;
use tracing::debug;

type ProjectionOf<L, P> = SearchProjection<ReferenceOf<L>, EntityOf<L>, P>;

// ============================================================================
// Select step
// ============================================================================

/// First step: choose what each hit resolves to
pub struct SearchQuerySelectStep<L: LoadingContextBuilder> {
    scope: SearchScope,
    loading: L,
}

impl<L: LoadingContextBuilder> SearchQuerySelectStep<L> {
    pub(crate) fn new(scope: SearchScope, loading: L) -> Self {
        SearchQuerySelectStep { scope, loading }
    }

    fn factory(&self) -> SearchProjectionFactory<ReferenceOf<L>, EntityOf<L>> {
        SearchProjectionFactory::new(self.scope.clone())
    }

    fn with_projection<P>(self, projection: ProjectionOf<L, P>) -> SearchQueryWhereStep<L, P> {
        SearchQueryWhereStep {
            scope: self.scope,
            loading: self.loading,
            projection,
        }
    }

    /// Hits resolve to loaded entities
    pub fn select_entity(self) -> SearchQueryWhereStep<L, EntityOf<L>> {
        let projection = self.factory().entity();
        self.with_projection(projection)
    }

    /// Hits resolve to application references, without loading
    pub fn select_entity_reference(self) -> SearchQueryWhereStep<L, ReferenceOf<L>> {
        let projection = self.factory().entity_reference();
        self.with_projection(projection)
    }

    /// Hits resolve to an arbitrary projection
    ///
    /// # Errors
    ///
    /// Returns the first error raised while building the projection.
    pub fn select<F, S>(self, build: F) -> Result<SearchQueryWhereStep<L, S::Output>>
    where
        F: FnOnce(&SearchProjectionFactory<ReferenceOf<L>, EntityOf<L>>) -> S,
        S: ProjectionFinalStep<ReferenceOf<L>, EntityOf<L>>,
    {
        let projection = build(&self.factory()).to_projection()?;
        Ok(self.with_projection(projection))
    }

    /// Set the predicate, selecting entities
    pub fn where_<F, S>(self, build: F) -> Result<SearchQueryOptionsStep<L, EntityOf<L>>>
    where
        F: FnOnce(&SearchPredicateFactory) -> S,
        S: PredicateFinalStep,
    {
        self.select_entity().where_(build)
    }

    /// Configure loading options
    pub fn loading(mut self, configure: impl FnOnce(&mut L::Options)) -> Self {
        configure(self.loading.options_mut());
        self
    }

    /// Negotiate a backend-specific select step
    pub fn extension<X>(self, extension: &X) -> Result<X::Extended>
    where
        X: SearchExtension<Self>,
    {
        let backend = self.scope.backend().clone();
        negotiate(extension, self, backend.as_ref())
    }
}

// ============================================================================
// Where step
// ============================================================================

/// Second step: set the predicate, or skip it to match every document
pub struct SearchQueryWhereStep<L: LoadingContextBuilder, P> {
    scope: SearchScope,
    loading: L,
    projection: ProjectionOf<L, P>,
}

impl<L: LoadingContextBuilder, P> SearchQueryWhereStep<L, P> {
    /// Set the predicate
    ///
    /// # Errors
    ///
    /// Returns the first error raised while building the predicate.
    pub fn where_<F, S>(self, build: F) -> Result<SearchQueryOptionsStep<L, P>>
    where
        F: FnOnce(&SearchPredicateFactory) -> S,
        S: PredicateFinalStep,
    {
        let predicate = build(&SearchPredicateFactory::new(self.scope.clone())).to_predicate()?;
        Ok(self.with_predicate(predicate))
    }

    /// Skip the predicate: every document of the scope matches
    pub fn match_all(self) -> SearchQueryOptionsStep<L, P> {
        self.with_predicate(SearchPredicate::MatchAll)
    }

    fn with_predicate(self, predicate: SearchPredicate) -> SearchQueryOptionsStep<L, P> {
        SearchQueryOptionsStep {
            scope: self.scope,
            loading: self.loading,
            projection: self.projection,
            predicate,
            sort: None,
            timeout: None,
            total_hit_count_threshold: None,
        }
    }

    /// Configure loading options
    pub fn loading(mut self, configure: impl FnOnce(&mut L::Options)) -> Self {
        configure(self.loading.options_mut());
        self
    }

    /// Negotiate a backend-specific where step
    pub fn extension<X>(self, extension: &X) -> Result<X::Extended>
    where
        X: SearchExtension<Self>,
    {
        let backend = self.scope.backend().clone();
        negotiate(extension, self, backend.as_ref())
    }
}

impl<L: LoadingContextBuilder, P: Send + 'static> SearchQueryWhereStep<L, P> {
    /// Compile a query without a predicate
    pub fn to_query(self) -> SearchQuery<L::Context, P> {
        self.match_all().to_query()
    }
}

// ============================================================================
// Options step
// ============================================================================

/// Last step: options, then compile or execute
pub struct SearchQueryOptionsStep<L: LoadingContextBuilder, P> {
    scope: SearchScope,
    loading: L,
    projection: ProjectionOf<L, P>,
    predicate: SearchPredicate,
    sort: Option<SearchSort>,
    timeout: Option<TimeoutPolicy>,
    total_hit_count_threshold: Option<u64>,
}

impl<L: LoadingContextBuilder, P: Send + 'static> SearchQueryOptionsStep<L, P> {
    /// Replace the predicate
    pub fn where_<F, S>(mut self, build: F) -> Result<Self>
    where
        F: FnOnce(&SearchPredicateFactory) -> S,
        S: PredicateFinalStep,
    {
        self.predicate = build(&SearchPredicateFactory::new(self.scope.clone())).to_predicate()?;
        Ok(self)
    }

    /// Replace the sort
    ///
    /// # Errors
    ///
    /// Returns the first error raised while building the sort.
    pub fn sort<F, S>(mut self, build: F) -> Result<Self>
    where
        F: FnOnce(SearchSortFactory) -> S,
        S: SortFinalStep,
    {
        self.sort = Some(build(SearchSortFactory::new(self.scope.clone())).to_sort()?);
        Ok(self)
    }

    /// Configure loading options
    pub fn loading(mut self, configure: impl FnOnce(&mut L::Options)) -> Self {
        configure(self.loading.options_mut());
        self
    }

    fn set_timeout(mut self, requested: TimeoutPolicy) -> Result<Self> {
        if let Some(existing) = self.timeout {
            return Err(Error::ConflictingTimeout {
                existing: existing.to_string(),
                requested: requested.to_string(),
            });
        }
        self.timeout = Some(requested);
        Ok(self)
    }

    /// Raise `Error::Timeout` if an execution takes longer than `duration`
    ///
    /// # Errors
    ///
    /// Returns `Error::ConflictingTimeout` if a timeout is already set.
    pub fn fail_after(self, duration: Duration) -> Result<Self> {
        self.set_timeout(TimeoutPolicy::fail_after(duration))
    }

    /// Return partial results if an execution takes longer than `duration`
    ///
    /// # Errors
    ///
    /// Returns `Error::ConflictingTimeout` if a timeout is already set.
    pub fn truncate_after(self, duration: Duration) -> Result<Self> {
        self.set_timeout(TimeoutPolicy::truncate_after(duration))
    }

    /// Allow the backend to stop counting exactly past `threshold` matches
    ///
    /// Ignored by backends that do not support it.
    pub fn total_hit_count_threshold(mut self, threshold: u64) -> Self {
        if self.scope.backend().supports_total_hit_count_threshold() {
            self.total_hit_count_threshold = Some(threshold);
        } else {
            debug!(
                target: "sift::query",
                backend = self.scope.backend().name(),
                threshold,
                "Backend does not support total hit count thresholds, ignoring"
            );
        }
        self
    }

    /// Negotiate a backend-specific options step
    pub fn extension<X>(self, extension: &X) -> Result<X::Extended>
    where
        X: SearchExtension<Self>,
    {
        let backend = self.scope.backend().clone();
        negotiate(extension, self, backend.as_ref())
    }

    /// Compile the query
    ///
    /// The loading context is built here, from the options configured so far.
    /// Configured defaults fill in the timeout and threshold when unset.
    pub fn to_query(self) -> SearchQuery<L::Context, P> {
        let config = self.scope.config();
        let timeout = self.timeout.or_else(|| config.default_timeout());
        let threshold = self.total_hit_count_threshold.or_else(|| {
            config
                .default_total_hit_count_threshold
                .filter(|_| self.scope.backend().supports_total_hit_count_threshold())
        });
        let loading = self.loading.build();
        SearchQuery::new(
            self.scope,
            self.predicate,
            self.sort,
            timeout,
            threshold,
            self.projection,
            loading,
        )
    }

    /// Compile and fetch every hit
    pub fn fetch_all(self) -> Result<SearchResult<P>> {
        self.to_query().fetch_all()
    }

    /// Compile and fetch a window of hits
    pub fn fetch(self, offset: Option<usize>, limit: Option<usize>) -> Result<SearchResult<P>> {
        self.to_query().fetch(offset, limit)
    }

    /// Compile and fetch a window of hits without counting
    pub fn fetch_hits(self, offset: Option<usize>, limit: Option<usize>) -> Result<Vec<P>> {
        self.to_query().fetch_hits(offset, limit)
    }

    /// Compile and count matches
    pub fn fetch_total_hit_count(self) -> Result<u64> {
        self.to_query().fetch_total_hit_count()
    }

    /// Compile and fetch the only hit, if any
    pub fn fetch_single_hit(self) -> Result<Option<P>> {
        self.to_query().fetch_single_hit()
    }
}
