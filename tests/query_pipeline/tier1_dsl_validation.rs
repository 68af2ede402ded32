//! Tier 1: DSL Validation
//!
//! Mistakes surface as errors at the step that introduced them, before any
//! execution reaches the backend.

use crate::test_utils::*;
use sift::{
    BooleanOperator, Error, InMemoryBackend, InMemoryExtension, NativePredicate, Negotiation,
    SearchBackend, SearchConfig, SearchExtension, SearchPredicate, SearchPredicateFactory,
    SearchScope,
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// Extension no backend supports
struct NeverSupported;

impl SearchExtension<SearchPredicateFactory> for NeverSupported {
    type Extended = SearchPredicateFactory;

    fn extend_optional(
        &self,
        original: SearchPredicateFactory,
        _backend: &dyn SearchBackend,
    ) -> Negotiation<SearchPredicateFactory, SearchPredicateFactory> {
        Negotiation::Unsupported(original)
    }
}

/// Native predicate built for some other backend
#[derive(Debug)]
struct ElsewherePredicate;

impl NativePredicate for ElsewherePredicate {
    fn backend(&self) -> &str {
        "elsewhere"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Scope
// ============================================================================

#[test]
fn test_scope_rejects_unknown_index() {
    let err = SearchScope::new(library_backend(), &["books", "magazines"]).unwrap_err();
    assert_eq!(
        err,
        Error::UnknownIndex {
            index: "magazines".to_string()
        }
    );
}

#[test]
fn test_scope_rejects_empty_index_list() {
    let err = SearchScope::new(library_backend(), &[]).unwrap_err();
    assert!(matches!(err, Error::InvalidInput { .. }));
}

#[test]
fn test_scope_rejects_invalid_config() {
    let config = SearchConfig {
        max_result_window: 0,
        ..SearchConfig::default()
    };
    let err = SearchScope::with_config(library_backend(), &["books"], config).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn test_config_from_toml() {
    let config = SearchConfig::from_toml_str(
        "max_result_window = 50\ndefault_total_hit_count_threshold = 10\n",
    )
    .unwrap();
    assert_eq!(config.max_result_window, 50);
    assert_eq!(config.default_total_hit_count_threshold, Some(10));

    assert!(SearchConfig::from_toml_str("no_such_key = 1").is_err());
}

// ============================================================================
// Predicates
// ============================================================================

#[test]
fn test_unknown_field_fails_at_where() {
    let err = books_scope()
        .query()
        .where_(|f| f.match_().field("publisher").matching("Ace"))
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "publisher"));
}

#[test]
fn test_unknown_field_in_nested_bool_clause() {
    let err = books_scope()
        .query()
        .where_(|f| {
            f.bool_()
                .must(f.match_().field("title").matching("dune"))
                .should(f.range().field("pagecount").at_least(100))
        })
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "pagecount"));
}

#[test]
fn test_range_on_text_field_is_rejected() {
    let err = books_scope()
        .query()
        .where_(|f| f.range().field("title").at_least("m"))
        .err()
        .unwrap();
    assert!(matches!(err, Error::FieldCapability { .. }));
}

#[test]
fn test_too_many_clauses() {
    let scope = books_scope_with(SearchConfig {
        max_clause_count: 2,
        ..SearchConfig::default()
    });
    let err = scope
        .query()
        .where_(|f| {
            f.bool_()
                .should(f.match_().field("genre").matching("scifi"))
                .should(f.match_().field("genre").matching("fantasy"))
                .should(f.match_().field("genre").matching("horror"))
        })
        .err()
        .unwrap();
    assert_eq!(err, Error::TooManyClauses { count: 3, max: 2 });
}

#[test]
fn test_empty_query_string_is_rejected() {
    let err = books_scope()
        .query()
        .where_(|f| {
            f.simple_query_string()
                .field("title")
                .default_operator(BooleanOperator::And)
                .matching("   ")
        })
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidQueryString { .. }));
}

#[test]
fn test_foreign_native_predicate_fails_at_execution() {
    let query = books_scope()
        .query()
        .where_(|_| SearchPredicate::Native(Arc::new(ElsewherePredicate)))
        .unwrap()
        .to_query();
    let err = query.fetch_all().unwrap_err();
    assert!(matches!(err, Error::ForeignPredicate { .. }));
}

// ============================================================================
// Sorts and projections
// ============================================================================

#[test]
fn test_sort_on_non_sortable_field() {
    let err = books_scope()
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(|f| f.field("pages").then().field("title"))
        .err()
        .unwrap();
    assert!(matches!(err, Error::FieldCapability { .. }));
}

#[test]
fn test_projection_on_non_projectable_field() {
    let err = books_scope()
        .query()
        .select(|f| f.field::<String>("isbn"))
        .err()
        .unwrap();
    assert!(matches!(err, Error::FieldCapability { .. }));
}

#[test]
fn test_object_projection_on_unknown_object() {
    let err = books_scope()
        .query()
        .select(|f| f.object("publisher", f.field::<String>("publisher.name")))
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnknownField { .. }));
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_conflicting_timeouts() {
    let err = books_scope()
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .fail_after(Duration::from_secs(1))
        .unwrap()
        .truncate_after(Duration::from_secs(2))
        .err()
        .unwrap();
    assert!(matches!(err, Error::ConflictingTimeout { .. }));
}

#[test]
fn test_window_too_large() {
    let scope = books_scope_with(SearchConfig {
        max_result_window: 3,
        ..SearchConfig::default()
    });
    let query = scope.query().where_(|f| f.match_all()).unwrap().to_query();
    assert!(query.fetch(Some(1), Some(2)).is_ok());
    let err = query.fetch(Some(2), Some(2)).unwrap_err();
    assert_eq!(
        err,
        Error::WindowTooLarge {
            offset: 2,
            limit: 2,
            max: 3
        }
    );
    assert!(query.fetch_hits(Some(0), Some(4)).is_err());
    // unbounded windows are not limited
    assert_eq!(query.fetch(Some(1), None).unwrap().hits().len(), 4);
}

// ============================================================================
// Extensions
// ============================================================================

#[test]
fn test_unsupported_extension_fails_immediately() {
    let err = books_scope().predicate().extension(&NeverSupported).unwrap_err();
    assert_eq!(
        err,
        Error::UnsupportedExtension {
            extension: "NeverSupported".to_string(),
            backend: "in-memory".to_string(),
        }
    );
}

#[test]
fn test_unsupported_extension_inside_where() {
    let err = books_scope()
        .query()
        .where_(|f| {
            f.extension(&NeverSupported)
                .map(|portable| portable.match_all())
        })
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnsupportedExtension { .. }));
}

#[test]
fn test_in_memory_extension_predicate() {
    let hits = books_scope()
        .query()
        .where_(|f| {
            f.extension(&InMemoryExtension).map(|memory| {
                memory.from_filter("long books", |doc| {
                    doc.first("pages")
                        .and_then(|v| v.as_f64())
                        .map_or(false, |pages| pages > 300.0)
                })
            })
        })
        .unwrap()
        .sort(|f| f.field("pages"))
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(ids(&hits), vec!["1", "4", "3"]);
}

#[test]
fn test_in_memory_query_explain() {
    let query = books_scope()
        .query()
        .where_(|f| f.match_().field("title").matching("dune"))
        .unwrap()
        .to_query()
        .extension(&InMemoryExtension)
        .unwrap();

    let matching = query.explain("3").unwrap();
    assert!(matching.is_match());
    assert!(matching.to_string().starts_with("books/3: match"));

    let other = query.explain("1").unwrap();
    assert!(!other.is_match());
    assert_eq!(other.to_string(), "books/1: no match");

    // the extended query still executes
    assert_eq!(query.fetch_total_hit_count().unwrap(), 1);
}

#[test]
fn test_backend_downcast_is_exposed() {
    let backend: Arc<dyn SearchBackend> = library_backend();
    assert!(backend.as_any().downcast_ref::<InMemoryBackend>().is_some());
    assert_eq!(backend.name(), "in-memory");
}
