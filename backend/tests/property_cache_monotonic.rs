//! Property Test: Latest-State Cache Monotonicity
//!
//! This property test verifies that:
//! - Offering readings in any order never moves the cached timestamp backwards
//! - The cache ends up holding the newest reading regardless of delivery order
//! - `update_if_newer` reports a change exactly when the cached entry moved

use agriweather_backend::test_utils::generators;
use agriweather_backend::{latest_of, LatestStateCache, Reading};
use proptest::prelude::*;

fn readings() -> impl Strategy<Value = Vec<Reading>> {
    prop::collection::vec(generators::reading("dev-1"), 1..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the cached entry never regresses
    #[test]
    fn prop_cache_never_regresses(batch in readings()) {
        let cache = LatestStateCache::new();

        for reading in batch {
            let before = cache.get("dev-1");
            let changed = cache.update_if_newer("dev-1", reading.clone());
            let after = cache.get("dev-1").unwrap();

            match before {
                Some(previous) => {
                    prop_assert!(!previous.is_newer_than(&after));
                    prop_assert_eq!(changed, reading.is_newer_than(&previous));
                }
                None => prop_assert!(changed),
            }
        }
    }

    /// Property: delivery order does not change the final state
    #[test]
    fn prop_final_state_is_newest(batch in readings()) {
        let forward = LatestStateCache::new();
        let backward = LatestStateCache::new();

        for reading in &batch {
            forward.update_if_newer("dev-1", reading.clone());
        }
        for reading in batch.iter().rev() {
            backward.update_if_newer("dev-1", reading.clone());
        }

        let newest = latest_of(batch).unwrap();
        prop_assert_eq!(
            forward.last_seen("dev-1"),
            Some(newest.timestamp.clone())
        );
        prop_assert_eq!(backward.last_seen("dev-1"), Some(newest.timestamp));
    }

    /// Property: re-offering the cached reading is a no-op
    #[test]
    fn prop_duplicate_is_not_an_update(batch in readings()) {
        let cache = LatestStateCache::new();
        for reading in &batch {
            cache.update_if_newer("dev-1", reading.clone());
        }

        let cached = cache.get("dev-1").unwrap();
        prop_assert!(!cache.update_if_newer("dev-1", cached));
    }
}
