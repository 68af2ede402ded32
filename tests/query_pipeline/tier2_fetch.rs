//! Tier 2: Fetch Semantics
//!
//! Windows, totals and single-hit cardinality, executed through the
//! in-memory backend.

use crate::test_utils::*;
use sift::{Error, SearchConfig};

// ============================================================================
// Windows
// ============================================================================

#[test]
fn test_offset_skips_leading_hits_and_keeps_total() {
    let query = numbers_scope(200)
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(|f| f.field("value").asc())
        .unwrap()
        .to_query();

    let result = query.fetch(Some(1), None).unwrap();
    assert_eq!(result.hits().len(), 199);
    assert_eq!(ids(result.hits()), id_range(1, 200));
    assert_eq!(result.total().hit_count().unwrap(), 200);
}

#[test]
fn test_limit_keeps_leading_hits() {
    let query = numbers_scope(200)
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(|f| f.field("value").asc())
        .unwrap()
        .to_query();

    let result = query.fetch(None, Some(2)).unwrap();
    assert_eq!(ids(result.hits()), vec!["0", "1"]);
    assert_eq!(result.total().hit_count().unwrap(), 200);
}

#[test]
fn test_offset_past_the_end() {
    let query = numbers_scope(200)
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(|f| f.field("value").asc())
        .unwrap()
        .to_query();

    let result = query.fetch(Some(201), None).unwrap();
    assert!(result.hits().is_empty());
    assert_eq!(result.total().hit_count().unwrap(), 200);
}

#[test]
fn test_zero_limit() {
    let query = numbers_scope(200)
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .to_query();

    let result = query.fetch(Some(0), Some(0)).unwrap();
    assert!(result.hits().is_empty());
    assert_eq!(result.total().hit_count().unwrap(), 200);
}

#[test]
fn test_fetch_all_returns_every_hit_in_sort_order() {
    let hits = numbers_scope(50)
        .query()
        .where_(|f| f.range().field("value").between(10, 19))
        .unwrap()
        .sort(|f| f.field("value").desc())
        .unwrap()
        .fetch_all()
        .unwrap()
        .into_hits();
    let expected: Vec<String> = (10..20).rev().map(|i| i.to_string()).collect();
    assert_eq!(ids(&hits), expected);
}

#[test]
fn test_fetch_hits_matches_fetch() {
    let query = numbers_scope(30)
        .query()
        .where_(|f| f.match_().field("body").matching("even"))
        .unwrap()
        .sort(|f| f.field("label"))
        .unwrap()
        .to_query();

    let hits = query.fetch_hits(Some(3), Some(4)).unwrap();
    let result = query.fetch(Some(3), Some(4)).unwrap();
    assert_eq!(hits, result.hits());
    assert_eq!(ids(&hits), vec!["6", "8", "10", "12"]);
}

// ============================================================================
// Total hit count
// ============================================================================

#[test]
fn test_total_hit_count_ignores_windows() {
    let query = numbers_scope(40)
        .query()
        .where_(|f| f.range().field("value").less_than(25))
        .unwrap()
        .to_query();

    assert_eq!(query.fetch(Some(5), Some(3)).unwrap().hits().len(), 3);
    assert_eq!(query.fetch_total_hit_count().unwrap(), 25);
    assert_eq!(query.fetch_all().unwrap().hits().len(), 25);
    assert_eq!(query.fetch(Some(20), Some(10)).unwrap().hits().len(), 5);
    assert_eq!(query.fetch_total_hit_count().unwrap(), 25);
}

#[test]
fn test_total_hit_count_of_no_match() {
    let count = books_scope()
        .query()
        .where_(|f| f.match_().field("title").matching("nonexistent"))
        .unwrap()
        .fetch_total_hit_count()
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_threshold_turns_total_into_lower_bound() {
    let result = numbers_scope(100)
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(|f| f.index_order())
        .unwrap()
        .total_hit_count_threshold(10)
        .fetch(None, Some(5))
        .unwrap();

    assert_eq!(result.hits().len(), 5);
    let total = result.total();
    assert!(total.is_hit_count_lower_bound());
    assert!(total.hit_count_lower_bound() > 10);
    assert!(total.hit_count_lower_bound() <= 100);
    assert!(matches!(total.hit_count(), Err(Error::InexactHitCount { .. })));
}

#[test]
fn test_threshold_above_match_count_stays_exact() {
    let result = numbers_scope(20)
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(|f| f.index_order())
        .unwrap()
        .total_hit_count_threshold(1000)
        .fetch(None, Some(5))
        .unwrap();
    assert!(result.total().is_hit_count_exact());
    assert_eq!(result.total().hit_count().unwrap(), 20);
}

#[test]
fn test_fetch_total_hit_count_is_exact_despite_threshold() {
    let count = numbers_scope(100)
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(|f| f.index_order())
        .unwrap()
        .total_hit_count_threshold(10)
        .fetch_total_hit_count()
        .unwrap();
    assert_eq!(count, 100);
}

#[test]
fn test_configured_default_threshold() {
    let scope = numbers_scope_with(
        100,
        SearchConfig {
            default_total_hit_count_threshold: Some(5),
            ..SearchConfig::default()
        },
    );
    let query = scope
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(|f| f.index_order())
        .unwrap()
        .to_query();
    assert_eq!(query.total_hit_count_threshold(), Some(5));
    assert!(query
        .fetch(None, Some(1))
        .unwrap()
        .total()
        .is_hit_count_lower_bound());
}

// ============================================================================
// Single hit
// ============================================================================

#[test]
fn test_single_hit_cardinality() {
    let scope = books_scope();

    let one = scope
        .query()
        .where_(|f| f.match_().field("title").matching("hobbit"))
        .unwrap()
        .fetch_single_hit()
        .unwrap();
    assert_eq!(one.map(|r| r.id().to_string()), Some("4".to_string()));

    let none = scope
        .query()
        .where_(|f| f.match_().field("genre").matching("horror"))
        .unwrap()
        .fetch_single_hit()
        .unwrap();
    assert!(none.is_none());

    let err = scope
        .query()
        .where_(|f| f.match_().field("genre").matching("scifi"))
        .unwrap()
        .fetch_single_hit()
        .unwrap_err();
    assert!(matches!(err, Error::NonUniqueHit { .. }));
}

// ============================================================================
// Predicates end to end
// ============================================================================

#[test]
fn test_bool_predicate_clauses() {
    let hits = books_scope()
        .query()
        .where_(|f| {
            f.bool_()
                .filter(f.match_().field("available").matching(true))
                .must(f.match_().field("author.name").matching("guin"))
                .must_not(f.range().field("pages").less_than(200))
        })
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(ids(&hits), vec!["1"]);
}

#[test]
fn test_minimum_should_match() {
    let hits = books_scope()
        .query()
        .where_(|f| {
            f.bool_()
                .should(f.match_().field("genre").matching("scifi"))
                .should(f.range().field("pages").at_least(300))
                .should(f.match_().field("available").matching(true))
                .minimum_should_match_number(3)
        })
        .unwrap()
        .sort(|f| f.field("pages"))
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(ids(&hits), vec!["1"]);
}

#[test]
fn test_simple_query_string_operators() {
    let scope = books_scope();
    let count = |query: &str| {
        scope
            .query()
            .where_(|f| f.simple_query_string().fields(&["title", "summary"]).matching(query))
            .unwrap()
            .fetch_total_hit_count()
            .unwrap()
    };

    assert_eq!(count("planet"), 2);
    assert_eq!(count("planet -desert"), 1);
    assert_eq!(count("hobbit | dune"), 2);
    assert_eq!(count("+wizard +power"), 1);
    assert_eq!(count("\"galactic empire\""), 1);
    assert_eq!(count("found*"), 1);
}

#[test]
fn test_spatial_and_exists_predicates() {
    let scope = books_scope();

    let near_paris = scope
        .query()
        .where_(|f| f.spatial().within().field("location").circle(paris(), 500_000.0))
        .unwrap()
        .sort(|f| f.field("pages"))
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(ids(&near_paris), vec!["2", "1"]);

    let located = scope
        .query()
        .where_(|f| f.exists().field("location"))
        .unwrap()
        .fetch_total_hit_count()
        .unwrap();
    assert_eq!(located, 4);

    let with_author = scope
        .query()
        .where_(|f| f.exists().field("author"))
        .unwrap()
        .fetch_total_hit_count()
        .unwrap();
    assert_eq!(with_author, 4);
}

#[test]
fn test_id_predicate_and_not() {
    let scope = books_scope();
    let hits = scope
        .query()
        .where_(|f| f.id().matching_any(["1", "3", "9"]))
        .unwrap()
        .sort(|f| f.field("pages"))
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(ids(&hits), vec!["1", "3"]);

    let others = scope
        .query()
        .where_(|f| f.not(f.id().matching_any(["1", "3"])))
        .unwrap()
        .fetch_total_hit_count()
        .unwrap();
    assert_eq!(others, 3);
}

#[test]
fn test_multi_index_scope() {
    let scope = library_scope();
    let hits = scope
        .query()
        .where_(|f| f.match_().field("title").matching("dune"))
        .unwrap()
        .sort(|f| f.field("pages"))
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    let refs: Vec<(String, String)> = hits
        .iter()
        .map(|r| (r.index().to_string(), r.id().to_string()))
        .collect();
    assert_eq!(
        refs,
        vec![
            ("articles".to_string(), "a2".to_string()),
            ("books".to_string(), "3".to_string()),
        ]
    );
}

#[test]
fn test_documents_visible_after_flush_only() {
    let backend = numbers_backend(3);
    let scope = sift::SearchScope::new(backend.clone(), &["numbers"]).unwrap();
    let query = scope.query().where_(|f| f.match_all()).unwrap().to_query();
    assert_eq!(query.fetch_total_hit_count().unwrap(), 3);

    let work = backend.work_executor("numbers").unwrap();
    work.add("100", |doc| {
        doc.add("value", 100);
    })
    .unwrap();
    work.delete("0");
    assert_eq!(query.fetch_total_hit_count().unwrap(), 3);

    assert_eq!(work.flush(), 2);
    assert_eq!(query.fetch_total_hit_count().unwrap(), 3);
    let ids_now = ids(&query.fetch_hits(None, None).unwrap());
    assert!(ids_now.contains(&"100".to_string()));
    assert!(!ids_now.contains(&"0".to_string()));
}
