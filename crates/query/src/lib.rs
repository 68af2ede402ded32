//! Query pipeline for Sift
//!
//! This crate turns fluent DSL calls into executable queries and maps the raw
//! hits of a [`SearchBackend`] into caller-defined projections:
//! - scope: indexes queried together, field resolution across their schemas
//! - dsl: predicate, sort and projection factories, and the query step chain
//! - query: compiled queries and their fetch variants
//! - scroll: chunked iteration with a monotonic total hit count
//! - loading: reference conversion and batched entity loading
//! - extension: negotiation of backend-specific DSL variants
//!
//! # Example
//!
//! ```ignore
//! let scope = SearchScope::new(backend, &["books"])?;
//! let titles = scope
//!     .query()
//!     .select(|f| f.field::<String>("title"))?
//!     .where_(|f| f.match_().field("title").matching("robot"))?
//!     .sort(|f| f.field("pages").desc())?
//!     .fetch_hits(None, Some(20))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod dsl;
pub mod extension;
pub mod loading;
mod mapping;
pub mod predicate;
pub mod projection;
pub mod query;
pub mod query_string;
pub mod scope;
pub mod scroll;
pub mod sort;

#[cfg(test)]
mod testing;

pub use backend::{
    BackendScroll, RawHit, RawSearchResult, SearchBackend, SearchRequest, TotalHitCountTracking,
};
pub use dsl::predicate::{PredicateFinalStep, PredicateOptionsStep, SearchPredicateFactory};
pub use dsl::projection::{ProjectionFinalStep, SearchProjectionFactory};
pub use dsl::query::{SearchQueryOptionsStep, SearchQuerySelectStep, SearchQueryWhereStep};
pub use dsl::sort::{SearchSortFactory, SortFinalStep};
pub use extension::{Negotiation, SearchExtension};
pub use loading::{
    EntityLoader, LoadingContext, LoadingContextBuilder, LoadingKey, LoadingOptions,
    LoadingResult, MapperLoading, MapperLoadingContext, NoLoading, NoLoadingContext,
    ProjectionHitMapper, SessionHandle,
};
pub use predicate::{NativePredicate, SearchPredicate};
pub use projection::{FromFieldValue, PendingHit, ProjectionSpec, SearchProjection};
pub use query::{SearchQuery, SearchResult};
pub use query_string::BooleanOperator;
pub use scope::SearchScope;
pub use scroll::{ScrollState, SearchScroll, SearchScrollResult};
pub use sort::{MissingValue, SearchSort, SortClause, SortOrder};
