//! Search scope: one or more indexes on one backend
//!
//! A scope is the entry point of the DSL. It resolves field paths against the
//! schemas of its indexes and hands out factories and query builders that all
//! share the scope through an `Arc`.
//!
//! # Multi-index field resolution
//!
//! A field must exist in at least one targeted index, with the same type in
//! every index declaring it. Capabilities are the intersection across those
//! indexes: a field is sortable only if every declaring index allows it.

use crate::backend::SearchBackend;
use crate::dsl::predicate::SearchPredicateFactory;
use crate::dsl::projection::SearchProjectionFactory;
use crate::dsl::query::SearchQuerySelectStep;
use crate::dsl::sort::SearchSortFactory;
use crate::loading::{EntityOf, LoadingContextBuilder, NoLoading, ReferenceOf};
use sift_core::{Error, FieldDefinition, IndexSchema, Result, SearchConfig};
use std::sync::Arc;
use tracing::debug;

struct ScopeInner {
    backend: Arc<dyn SearchBackend>,
    indexes: Vec<String>,
    schemas: Vec<Arc<IndexSchema>>,
    config: Arc<SearchConfig>,
}

/// A set of indexes queried together
#[derive(Clone)]
pub struct SearchScope {
    inner: Arc<ScopeInner>,
}

impl std::fmt::Debug for SearchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchScope")
            .field("backend", &self.inner.backend.name())
            .field("indexes", &self.inner.indexes)
            .finish()
    }
}

impl SearchScope {
    /// Create a scope with the default configuration
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `indexes` is empty
    /// - `UnknownIndex` if the backend does not know one of the indexes
    pub fn new(backend: Arc<dyn SearchBackend>, indexes: &[&str]) -> Result<Self> {
        Self::with_config(backend, indexes, SearchConfig::default())
    }

    /// Create a scope with an explicit configuration
    pub fn with_config(
        backend: Arc<dyn SearchBackend>,
        indexes: &[&str],
        config: SearchConfig,
    ) -> Result<Self> {
        if indexes.is_empty() {
            return Err(Error::invalid_input(
                "a search scope must target at least one index",
            ));
        }
        config.validate()?;

        let mut names: Vec<String> = Vec::with_capacity(indexes.len());
        for index in indexes {
            if !names.iter().any(|n| n == index) {
                names.push(index.to_string());
            }
        }
        let schemas = names
            .iter()
            .map(|name| backend.schema(name))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            target: "sift::query",
            backend = backend.name(),
            indexes = ?names,
            "Created search scope"
        );

        Ok(SearchScope {
            inner: Arc::new(ScopeInner {
                backend,
                indexes: names,
                schemas,
                config: Arc::new(config),
            }),
        })
    }

    /// Start a query without a mapper layer: hits resolve to document references
    pub fn query(&self) -> SearchQuerySelectStep<NoLoading> {
        self.query_with(NoLoading::new())
    }

    /// Start a query loading entities through the given loading builder
    pub fn query_with<L: LoadingContextBuilder>(&self, loading: L) -> SearchQuerySelectStep<L> {
        SearchQuerySelectStep::new(self.clone(), loading)
    }

    /// Predicate factory for building predicates outside of a query
    pub fn predicate(&self) -> SearchPredicateFactory {
        SearchPredicateFactory::new(self.clone())
    }

    /// Sort factory for building sorts outside of a query
    pub fn sort(&self) -> SearchSortFactory {
        SearchSortFactory::new(self.clone())
    }

    /// Projection factory for the reference and entity types of a loading builder
    pub fn projection<L: LoadingContextBuilder>(
        &self,
    ) -> SearchProjectionFactory<ReferenceOf<L>, EntityOf<L>> {
        SearchProjectionFactory::new(self.clone())
    }

    /// Targeted index names, deduplicated, in declaration order
    pub fn indexes(&self) -> &[String] {
        &self.inner.indexes
    }

    /// Active configuration
    pub fn config(&self) -> &SearchConfig {
        &self.inner.config
    }

    /// Backend executing queries of this scope
    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.inner.backend
    }

    /// Resolve a field path across every targeted index
    ///
    /// # Errors
    ///
    /// - `UnknownField` if no index declares the field
    /// - `InvalidInput` if indexes declare it with different types
    pub fn resolve_field(&self, path: &str) -> Result<FieldDefinition> {
        let mut resolved: Option<FieldDefinition> = None;
        for schema in &self.inner.schemas {
            let Some(def) = schema.field(path) else {
                continue;
            };
            resolved = Some(match resolved {
                None => *def,
                Some(existing) if existing.field_type != def.field_type => {
                    return Err(Error::invalid_input(format!(
                        "field '{}' has incompatible types across indexes: {} and {}",
                        path, existing.field_type, def.field_type
                    )));
                }
                Some(existing) => FieldDefinition {
                    field_type: existing.field_type,
                    searchable: existing.searchable && def.searchable,
                    sortable: existing.sortable && def.sortable,
                    projectable: existing.projectable && def.projectable,
                },
            });
        }
        resolved.ok_or_else(|| Error::UnknownField {
            field: path.to_string(),
            indexes: self.inner.indexes.clone(),
        })
    }

    /// Check that a path names an object in at least one targeted index
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` otherwise.
    pub fn resolve_object(&self, path: &str) -> Result<()> {
        if self.inner.schemas.iter().any(|s| s.has_object(path)) {
            Ok(())
        } else {
            Err(Error::UnknownField {
                field: path.to_string(),
                indexes: self.inner.indexes.clone(),
            })
        }
    }

    /// Check whether a path names a field or an object in some index
    pub fn is_known_path(&self, path: &str) -> bool {
        self.inner
            .schemas
            .iter()
            .any(|s| s.field(path).is_some() || s.has_object(path))
    }
}
