//! Tier 6: Projections and Sorts
//!
//! Hit mapping to projected values, and result order under each sort kind.

use crate::test_utils::*;
use sift::{DocumentReference, Error};

// ============================================================================
// Projections
// ============================================================================

#[test]
fn test_field_projections() {
    let titles = books_scope()
        .query()
        .select(|f| f.field::<String>("title"))
        .unwrap()
        .where_(|f| f.match_().field("genre").matching("fantasy"))
        .unwrap()
        .sort(|f| f.field("pages"))
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(
        titles,
        vec![
            Some("A Wizard of Earthsea".to_string()),
            Some("The Hobbit".to_string())
        ]
    );
}

#[test]
fn test_missing_field_projects_to_none() {
    let ratings = books_scope()
        .query()
        .select(|f| f.field::<f64>("rating"))
        .unwrap()
        .where_(|f| f.id().matching_any(["3", "5"]))
        .unwrap()
        .sort(|f| f.field("pages").desc())
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(ratings, vec![Some(4.3), None]);
}

#[test]
fn test_multi_valued_projection() {
    let genres = books_scope()
        .query()
        .select(|f| f.field::<String>("genre").multi())
        .unwrap()
        .where_(|f| f.id().matching("2"))
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(genres, vec![vec!["fantasy".to_string()]]);
}

#[test]
fn test_projection_type_mismatch() {
    let err = books_scope()
        .query()
        .select(|f| f.field::<i64>("title"))
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidInput { .. }));
}

#[test]
fn test_composite_projection() {
    let rows = books_scope()
        .query()
        .select(|f| {
            f.composite()
                .from3(f.id(), f.field::<String>("genre"), f.field::<i64>("pages"))
                .as_(|id, genre, pages| {
                    format!("{}:{}:{}", id, genre.unwrap_or_default(), pages.unwrap_or(0))
                })
        })
        .unwrap()
        .where_(|f| f.range().field("pages").at_least(300))
        .unwrap()
        .sort(|f| f.field("pages").desc())
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(rows, vec!["3:scifi:412", "4:fantasy:310", "1:scifi:304"]);
}

#[test]
fn test_list_composite_projection() {
    let rows = books_scope()
        .query()
        .select(|f| {
            f.composite()
                .from_list([f.field::<String>("title"), f.field::<String>("genre")])
                .as_list()
        })
        .unwrap()
        .where_(|f| f.id().matching("3"))
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(
        rows,
        vec![vec![Some("Dune".to_string()), Some("scifi".to_string())]]
    );
}

#[test]
fn test_object_projection() {
    let authors = books_scope()
        .query()
        .select(|f| {
            f.object(
                "author",
                f.composite()
                    .from2(f.field::<String>("author.name"), f.field::<i64>("author.born"))
                    .as_(|name, born| (name, born)),
            )
        })
        .unwrap()
        .where_(|f| f.id().matching_any(["3", "5"]))
        .unwrap()
        .sort(|f| f.field("pages").desc())
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(
        authors,
        vec![
            Some((Some("Frank Herbert".to_string()), Some(1920))),
            None
        ]
    );
}

#[test]
fn test_distance_projection() {
    let distances = books_scope()
        .query()
        .select(|f| f.distance("location", paris()))
        .unwrap()
        .where_(|f| f.id().matching_any(["1", "2", "4"]))
        .unwrap()
        .sort(|f| f.field("pages"))
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();

    assert_eq!(distances.len(), 3);
    // 2: London, 1: Paris, 4: no location
    let london = distances[0].unwrap();
    assert!(london > 300_000.0 && london < 400_000.0, "got {}", london);
    assert!(distances[1].unwrap() < 1.0);
    assert_eq!(distances[2], None);
}

#[test]
fn test_distance_projection_requires_geo_field() {
    let err = books_scope()
        .query()
        .select(|f| f.distance("pages", paris()))
        .err()
        .unwrap();
    assert!(matches!(err, Error::FieldCapability { .. }));
}

#[test]
fn test_score_projection_follows_score_order() {
    let scored = books_scope()
        .query()
        .select(|f| f.composite().from2(f.id(), f.score()).as_(|id, score| (id, score)))
        .unwrap()
        .where_(|f| {
            f.bool_()
                .should(f.match_().field("title").matching("dune").boost(3.0))
                .should(f.match_().field("summary").matching("planet"))
        })
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();

    assert_eq!(scored.len(), 2);
    assert_eq!(scored[0].0, "3");
    assert_eq!(scored[1].0, "1");
    assert!(scored[0].1 > scored[1].1);
    assert!(scored[1].1 > 0.0);
}

#[test]
fn test_reference_and_constant_projections() {
    let rows = library_scope()
        .query()
        .select(|f| {
            f.composite()
                .from2(f.document_reference(), f.constant("hit"))
                .as_(|reference, label| (reference, label))
        })
        .unwrap()
        .where_(|f| f.match_().field("title").matching("dune"))
        .unwrap()
        .sort(|f| f.field("pages").desc())
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    assert_eq!(
        rows,
        vec![
            (DocumentReference::new("books", "3"), "hit"),
            (DocumentReference::new("articles", "a2"), "hit"),
        ]
    );
}

// ============================================================================
// Sorts
// ============================================================================

fn sorted_ids<F, S>(sort: F) -> Vec<String>
where
    F: FnOnce(sift::SearchSortFactory) -> S,
    S: sift::SortFinalStep,
{
    let hits = books_scope()
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(sort)
        .unwrap()
        .fetch_hits(None, None)
        .unwrap();
    ids(&hits)
}

#[test]
fn test_field_sort_with_missing_values() {
    assert_eq!(
        sorted_ids(|f| f.field("rating").desc()),
        vec!["3", "4", "1", "2", "5"]
    );
    assert_eq!(
        sorted_ids(|f| f.field("rating").desc().missing_first()),
        vec!["5", "3", "4", "1", "2"]
    );
    assert_eq!(
        sorted_ids(|f| f.field("rating").missing_use(4.2)),
        vec!["2", "1", "5", "3", "4"]
    );
}

#[test]
fn test_multi_clause_sort() {
    assert_eq!(
        sorted_ids(|f| f.field("rating").then().field("pages").desc()),
        vec!["2", "1", "3", "4", "5"]
    );
    assert_eq!(
        sorted_ids(|f| f.field("genre").then().field("pages")),
        vec!["2", "4", "5", "1", "3"]
    );
}

#[test]
fn test_distance_sort() {
    assert_eq!(
        sorted_ids(|f| f.distance("location", paris())),
        vec!["1", "2", "3", "5", "4"]
    );
}

#[test]
fn test_index_order_sort() {
    assert_eq!(sorted_ids(|f| f.index_order()), vec!["1", "2", "3", "4", "5"]);
}
