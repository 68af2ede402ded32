//! Tier 5: Timeouts
//!
//! Fail-after raises `Error::Timeout`; truncate-after returns partial
//! results flagged `timed_out`.

use crate::test_utils::*;
use sift::{Error, ScrollState, SearchConfig, TimeoutKind, TimeoutPolicy};
use std::time::Duration;

const DOCS: usize = 500;

#[test]
fn test_fail_after_fetch_all() {
    let query = large_text_scope(DOCS)
        .query()
        .where_(|f| f.match_().field("body").matching("search query scroll"))
        .unwrap()
        .fail_after(Duration::from_nanos(1))
        .unwrap()
        .to_query();

    let err = query.fetch_all().unwrap_err();
    assert!(err.is_timeout());
    assert!(err.to_string().contains("1ns"), "message was: {}", err);
}

#[test]
fn test_fail_after_fetch_total_hit_count() {
    let query = large_text_scope(DOCS)
        .query()
        .where_(|f| f.match_().field("body").matching("search query scroll"))
        .unwrap()
        .fail_after(Duration::from_nanos(1))
        .unwrap()
        .to_query();

    let err = query.fetch_total_hit_count().unwrap_err();
    assert!(matches!(err, Error::Timeout { timeout, .. } if timeout == Duration::from_nanos(1)));
    assert!(err.to_string().contains("1ns"), "message was: {}", err);
}

#[test]
fn test_fail_after_index_order_scroll() {
    let query = large_text_scope(DOCS)
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(|f| f.index_order())
        .unwrap()
        .fail_after(Duration::from_nanos(1))
        .unwrap()
        .to_query();

    let outcome = query.scroll(50).and_then(|mut scroll| scroll.next().map(|_| ()));
    assert!(matches!(outcome, Err(Error::Timeout { .. })));
}

#[test]
fn test_truncate_after_returns_partial_results() {
    let query = large_text_scope(DOCS)
        .query()
        .where_(|f| f.match_().field("body").matching("search"))
        .unwrap()
        .truncate_after(Duration::from_nanos(1))
        .unwrap()
        .to_query();

    let result = query.fetch_all().unwrap();
    assert!(result.timed_out());
    assert!(result.hits().len() < DOCS);
    assert!(result.total().is_hit_count_lower_bound());

    // a truncated count is a lower bound, not an error
    let count = query.fetch_total_hit_count().unwrap();
    assert!(count < DOCS as u64);
}

#[test]
fn test_truncated_empty_chunk_keeps_scroll_open() {
    let query = large_text_scope(DOCS)
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .sort(|f| f.index_order())
        .unwrap()
        .truncate_after(Duration::from_nanos(1))
        .unwrap()
        .to_query();

    let mut scroll = query.scroll(50).unwrap();
    let chunk = scroll.next().unwrap();
    assert!(chunk.timed_out());
    assert!(!chunk.has_hits());
    assert!(chunk.total().is_hit_count_lower_bound());
    assert_eq!(scroll.state(), ScrollState::Open);
}

#[test]
fn test_truncate_after_bounds_sorted_scroll() {
    let query = large_text_scope(DOCS)
        .query()
        .where_(|f| f.match_().field("body").matching("search"))
        .unwrap()
        .truncate_after(Duration::from_nanos(1))
        .unwrap()
        .to_query();

    let fetched = query.fetch_all().unwrap();
    let mut scroll = query.scroll(50).unwrap();
    let chunk = scroll.next().unwrap();

    // scrolling honours the same timeout as fetching
    assert!(fetched.timed_out());
    assert!(chunk.timed_out());
    assert!(chunk.hits().len() < DOCS);
    assert!(chunk.total().is_hit_count_lower_bound());
}

#[test]
fn test_fail_after_sorted_scroll_open() {
    let query = large_text_scope(DOCS)
        .query()
        .where_(|f| f.match_().field("body").matching("search"))
        .unwrap()
        .fail_after(Duration::from_nanos(1))
        .unwrap()
        .to_query();

    let err = query.scroll(50).err().unwrap();
    assert!(err.is_timeout());
}

#[test]
fn test_generous_timeout_completes() {
    let result = large_text_scope(50)
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .fail_after(Duration::from_secs(60))
        .unwrap()
        .fetch_all()
        .unwrap();
    assert!(!result.timed_out());
    assert_eq!(result.hits().len(), 50);
    assert_eq!(result.total().hit_count().unwrap(), 50);
}

#[test]
fn test_configured_default_timeout() {
    let scope = numbers_scope_with(
        5,
        SearchConfig {
            default_timeout_ms: Some(250),
            default_timeout_kind: Some(TimeoutKind::Truncate),
            ..SearchConfig::default()
        },
    );

    let defaulted = scope.query().where_(|f| f.match_all()).unwrap().to_query();
    assert_eq!(
        defaulted.timeout(),
        Some(TimeoutPolicy::truncate_after(Duration::from_millis(250)))
    );

    // an explicit timeout wins over the configured one
    let explicit = scope
        .query()
        .where_(|f| f.match_all())
        .unwrap()
        .fail_after(Duration::from_secs(3))
        .unwrap()
        .to_query();
    assert_eq!(
        explicit.timeout(),
        Some(TimeoutPolicy::fail_after(Duration::from_secs(3)))
    );
    assert_eq!(explicit.fetch_total_hit_count().unwrap(), 5);
}
