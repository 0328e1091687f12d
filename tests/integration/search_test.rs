use diffsearch::search::parallel::{
    DifferenceQueue, NullReporter, ParallelConfig, run_parallel_search,
};
use diffsearch::search::{
    BranchAndBound, DiffPairProb, DifferentialSearch, ExhaustiveSearch, PruningPolicy,
    SearchConfig, best_ending,
};
use diffsearch::table::spn::{HEYS_SBOX, SpnLayer};
use diffsearch::RoundTable;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

const DENOMINATOR: u64 = 8;

/// Dense count matrix for a table whose rows each sum to at most one
fn counts_strategy(blocks: usize) -> impl Strategy<Value = Vec<Vec<u64>>> {
    prop::collection::vec(
        prop::collection::vec((0..blocks, 1u64..=4), 0..=3),
        blocks,
    )
    .prop_map(move |rows| {
        rows.into_iter()
            .map(|entries| {
                let mut row = vec![0u64; blocks];
                let mut total = 0;
                for (output, count) in entries {
                    if total + count <= DENOMINATOR {
                        row[output] += count;
                        total += count;
                    }
                }
                row
            })
            .collect()
    })
}

fn heys_table(min_probability: f64) -> RoundTable {
    SpnLayer::heys(HEYS_SBOX.to_vec())
        .unwrap()
        .round_table(min_probability)
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn exhaustive_policy_matches_enumeration(
        counts in counts_strategy(8),
        start in 0usize..8,
        rounds in 0usize..5,
    ) {
        let table = RoundTable::from_counts(&counts, DENOMINATOR).unwrap();
        let expected = ExhaustiveSearch::new(&table).search(start, rounds);
        let mut engine = BranchAndBound::new(&table);
        prop_assert_eq!(engine.search(start, rounds), expected);
    }

    #[test]
    fn best_so_far_keeps_the_best_ending(
        counts in counts_strategy(16),
        start in 1usize..16,
        rounds in 1usize..5,
    ) {
        let table = RoundTable::from_counts(&counts, DENOMINATOR).unwrap();
        let expected = ExhaustiveSearch::new(&table).search(start, rounds);
        let mut engine = BranchAndBound::with_pruning(&table, PruningPolicy::BestSoFar);
        let found = engine.search(start, rounds);

        let expected_best = best_ending(&expected).map(|b| b.probability);
        let found_best = best_ending(&found).map(|b| b.probability);
        prop_assert_eq!(found_best, expected_best);
        // Pruned results never overstate a probability
        for (f, e) in found.iter().zip(&expected) {
            prop_assert!(f <= e);
        }
    }

    #[test]
    fn threshold_keeps_every_strong_ending(
        counts in counts_strategy(8),
        start in 1usize..8,
        rounds in 1usize..4,
    ) {
        let threshold = 1.0 / 16.0;
        let table = RoundTable::from_counts(&counts, DENOMINATOR).unwrap();
        let expected = ExhaustiveSearch::new(&table).search(start, rounds);
        let mut engine =
            BranchAndBound::with_pruning(&table, PruningPolicy::Threshold(threshold));
        let found = engine.search(start, rounds);

        for (difference, &e) in expected.iter().enumerate() {
            if e >= threshold {
                prop_assert_eq!(found[difference], e);
            } else {
                prop_assert!(found[difference] <= e);
            }
        }
    }
}

#[test]
fn test_heys_three_round_characteristic() {
    let table = heys_table(0.1);
    let mut engine = BranchAndBound::new(&table);
    let probabilities = engine.search(0x0B00, 3);

    // 0x0b00 -> 0x0040 -> 0x0220 -> 0x0606 with 1/2 * 3/8 * 9/64
    assert!(probabilities[0x0606] >= 27.0 / 1024.0);
    assert_eq!(engine.statistics().searches, 1);

    let expected = ExhaustiveSearch::new(&table).search(0x0B00, 3);
    assert_eq!(probabilities, expected);
}

#[test]
fn test_parallel_matches_sequential_on_heys_range() {
    let table = Arc::new(heys_table(0.1));
    let search_config = SearchConfig::default().with_rounds(3);
    let parallel_config = ParallelConfig::default()
        .with_workers(3)
        .with_range(0x0B00, 0x0B20);

    let result = run_parallel_search(
        Arc::clone(&table),
        &search_config,
        &parallel_config,
        &mut NullReporter,
    )
    .unwrap();
    assert!(result.completed);
    assert_eq!(result.total_statistics.searches, 0x20);

    let mut engine = BranchAndBound::new(&table);
    let mut sequential: Option<DiffPairProb> = None;
    for start in 0x0B00..0x0B20 {
        let probabilities = engine.search(start, 3);
        if let Some(ending) = best_ending(&probabilities) {
            sequential = Some(DiffPairProb::fold_best(
                sequential,
                DiffPairProb::from_ending(start, ending),
            ));
        }
    }

    let parallel = result.best.unwrap();
    let sequential = sequential.unwrap();
    assert_eq!(parallel.probability, sequential.probability);
}

#[test]
fn test_queue_hands_out_every_difference_once_across_threads() {
    let queue = Arc::new(DifferenceQueue::new(1 << 12));
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.claims().collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for difference in handle.join().unwrap() {
            assert!(seen.insert(difference), "{:#x} claimed twice", difference);
        }
    }
    assert_eq!(seen.len(), (1 << 12) - 1);
    assert!(!seen.contains(&0));
    assert_eq!(queue.remaining(), 0);
}
