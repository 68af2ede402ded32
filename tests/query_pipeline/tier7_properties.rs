//! Tier 7: Property-Based
//!
//! Window arithmetic and scroll completeness over random sizes.

use crate::test_utils::*;
use proptest::prelude::*;
use sift::SortFinalStep;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_window_is_a_slice_of_the_full_result(
        count in 0usize..60,
        offset in 0usize..80,
        limit in 0usize..30,
    ) {
        let query = numbers_scope(count)
            .query()
            .where_(|f| f.match_all())
            .unwrap()
            .sort(|f| f.field("value"))
            .unwrap()
            .to_query();

        let result = query.fetch(Some(offset), Some(limit)).unwrap();
        let end = offset.saturating_add(limit).min(count);
        let expected = if offset >= count { Vec::new() } else { id_range(offset, end) };

        prop_assert_eq!(ids(result.hits()), expected);
        prop_assert_eq!(result.total().hit_count().unwrap(), count as u64);
        prop_assert_eq!(query.fetch_total_hit_count().unwrap(), count as u64);
    }

    #[test]
    fn prop_scroll_delivers_every_hit_once(
        count in 0usize..80,
        chunk_size in 1usize..20,
        index_order in any::<bool>(),
    ) {
        let query = numbers_scope(count)
            .query()
            .where_(|f| f.match_all())
            .unwrap()
            .sort(|f| {
                if index_order {
                    f.index_order().to_sort()
                } else {
                    f.field("value").to_sort()
                }
            })
            .unwrap()
            .to_query();
        let expected = ids(&query.fetch_hits(None, None).unwrap());

        let mut scroll = query.scroll(chunk_size).unwrap();
        let mut seen = Vec::new();
        let mut chunks = 0;
        loop {
            let chunk = scroll.next().unwrap();
            prop_assert!(chunk.hits().len() <= chunk_size);
            if !chunk.has_hits() {
                prop_assert_eq!(chunk.total().hit_count().unwrap(), count as u64);
                break;
            }
            chunks += 1;
            seen.extend(ids(chunk.hits()));
        }

        prop_assert_eq!(chunks, (count + chunk_size - 1) / chunk_size);
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn prop_threshold_bounds_never_shrink(
        count in 1usize..80,
        chunk_size in 1usize..20,
        threshold in 0u64..40,
    ) {
        let query = numbers_scope(count)
            .query()
            .where_(|f| f.match_all())
            .unwrap()
            .sort(|f| f.index_order())
            .unwrap()
            .total_hit_count_threshold(threshold)
            .to_query();

        let mut scroll = query.scroll(chunk_size).unwrap();
        let mut delivered = 0u64;
        let mut bound = 0u64;
        let mut exact = false;
        loop {
            let chunk = scroll.next().unwrap();
            delivered += chunk.hits().len() as u64;
            let total = chunk.total();

            prop_assert!(total.hit_count_lower_bound() >= bound);
            prop_assert!(total.hit_count_lower_bound() >= delivered);
            prop_assert!(total.hit_count_lower_bound() <= count as u64);
            prop_assert!(!exact || total.is_hit_count_exact());

            bound = total.hit_count_lower_bound();
            exact = total.is_hit_count_exact();
            if !chunk.has_hits() {
                break;
            }
        }
        prop_assert!(exact);
        prop_assert_eq!(bound, count as u64);
    }
}
