//! Backend-specific DSL for the in-memory backend
//!
//! ```ignore
//! let predicate = scope
//!     .predicate()
//!     .extension(&InMemoryExtension)?
//!     .from_filter("long-books", |doc| doc.first("pages").and_then(FieldValue::as_f64) > Some(500.0));
//!
//! let query = scope.query().where_(|_| predicate)?.to_query().extension(&InMemoryExtension)?;
//! println!("{}", query.explain("42")?);
//! ```

use crate::backend::{InMemoryBackend, BACKEND_NAME};
use crate::eval::Evaluator;
use sift_core::{Document, DocumentReference, Error, Result};
use sift_query::{
    LoadingContext, NativePredicate, Negotiation, SearchBackend, SearchExtension, SearchPredicate,
    SearchPredicateFactory, SearchQuery,
};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

type DocumentFilter = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// Extension giving access to in-memory specific predicates and query tools
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryExtension;

fn is_in_memory(backend: &dyn SearchBackend) -> bool {
    backend.as_any().is::<InMemoryBackend>()
}

// ============================================================================
// Predicates
// ============================================================================

/// Native predicate running a closure over stored fields
#[derive(Clone)]
pub struct FilterPredicate {
    name: String,
    filter: DocumentFilter,
}

impl FilterPredicate {
    /// Name given at creation, for logs and debugging
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn matches(&self, document: &Document) -> bool {
        (self.filter)(document)
    }
}

impl fmt::Debug for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterPredicate")
            .field("name", &self.name)
            .finish()
    }
}

impl NativePredicate for FilterPredicate {
    fn backend(&self) -> &str {
        BACKEND_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Predicate factory extended with in-memory predicates
#[derive(Debug, Clone)]
pub struct InMemoryPredicateFactory {
    portable: SearchPredicateFactory,
}

impl InMemoryPredicateFactory {
    /// Match documents for which `filter` returns true; constant score
    pub fn from_filter<F>(&self, name: &str, filter: F) -> SearchPredicate
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        SearchPredicate::Native(Arc::new(FilterPredicate {
            name: name.to_string(),
            filter: Arc::new(filter),
        }))
    }

    /// The portable factory this one extends
    pub fn portable(&self) -> &SearchPredicateFactory {
        &self.portable
    }
}

impl SearchExtension<SearchPredicateFactory> for InMemoryExtension {
    type Extended = InMemoryPredicateFactory;

    fn extend_optional(
        &self,
        original: SearchPredicateFactory,
        backend: &dyn SearchBackend,
    ) -> Negotiation<InMemoryPredicateFactory, SearchPredicateFactory> {
        if is_in_memory(backend) {
            Negotiation::Supported(InMemoryPredicateFactory { portable: original })
        } else {
            Negotiation::Unsupported(original)
        }
    }
}

// ============================================================================
// Query
// ============================================================================

/// Outcome of evaluating a query's predicate against one document
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    /// Explained document
    pub reference: DocumentReference,
    /// Score if the document matches, `None` otherwise
    pub score: Option<f32>,
}

impl Explanation {
    /// Check whether the document matches the query
    pub fn is_match(&self) -> bool {
        self.score.is_some()
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.score {
            Some(score) => write!(
                f,
                "{}/{}: match, score {:.4}",
                self.reference.index(),
                self.reference.id(),
                score
            ),
            None => write!(
                f,
                "{}/{}: no match",
                self.reference.index(),
                self.reference.id()
            ),
        }
    }
}

/// Query extended with in-memory tools; dereferences to the portable query
pub struct InMemorySearchQuery<C: LoadingContext, P> {
    query: SearchQuery<C, P>,
}

impl<C: LoadingContext, P: Send + 'static> InMemorySearchQuery<C, P> {
    /// Explain the score of a document of a single-index scope
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the scope targets several indexes or the
    /// document does not exist.
    pub fn explain(&self, id: &str) -> Result<Explanation> {
        match self.query.scope().indexes() {
            [index] => self.explain_in(index, id),
            indexes => Err(Error::invalid_input(format!(
                "explain() needs an index name when the scope targets {} indexes",
                indexes.len()
            ))),
        }
    }

    /// Explain the score of a document of one of the scope's indexes
    pub fn explain_in(&self, index: &str, id: &str) -> Result<Explanation> {
        if !self.query.scope().indexes().iter().any(|i| i == index) {
            return Err(Error::invalid_input(format!(
                "index '{}' is not part of the query scope",
                index
            )));
        }
        let backend = self
            .query
            .scope()
            .backend()
            .as_any()
            .downcast_ref::<InMemoryBackend>()
            .ok_or_else(|| Error::internal("in-memory query bound to another backend"))?;
        let snapshot = backend.index(index)?.snapshot();
        let doc = snapshot.get(id).ok_or_else(|| {
            Error::invalid_input(format!("document '{}' not found in index '{}'", id, index))
        })?;
        let score = Evaluator::new(&snapshot, BACKEND_NAME).score(self.query.predicate(), doc)?;
        Ok(Explanation {
            reference: DocumentReference::new(index, id),
            score,
        })
    }

    /// Back to the portable query
    pub fn into_inner(self) -> SearchQuery<C, P> {
        self.query
    }
}

impl<C: LoadingContext, P> Deref for InMemorySearchQuery<C, P> {
    type Target = SearchQuery<C, P>;

    fn deref(&self) -> &SearchQuery<C, P> {
        &self.query
    }
}

impl<C: LoadingContext, P: Send + 'static> SearchExtension<SearchQuery<C, P>> for InMemoryExtension {
    type Extended = InMemorySearchQuery<C, P>;

    fn extend_optional(
        &self,
        original: SearchQuery<C, P>,
        backend: &dyn SearchBackend,
    ) -> Negotiation<InMemorySearchQuery<C, P>, SearchQuery<C, P>> {
        if is_in_memory(backend) {
            Negotiation::Supported(InMemorySearchQuery { query: original })
        } else {
            Negotiation::Unsupported(original)
        }
    }
}
