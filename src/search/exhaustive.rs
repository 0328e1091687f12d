//! Unpruned reference enumeration
//!
//! Walks every path of the characteristic tree. Exponential in the number of
//! rounds, so it is only useful on small tables, where it serves as the
//! ground truth for the branch-and-bound engine.

use crate::search::config::PruningPolicy;
use crate::search::result::SearchStatistics;
use crate::search::DifferentialSearch;
use crate::table::{Difference, RoundTable};
use std::time::Instant;

pub struct ExhaustiveSearch<'t> {
    table: &'t RoundTable,
    statistics: SearchStatistics,
}

impl<'t> ExhaustiveSearch<'t> {
    pub fn new(table: &'t RoundTable) -> Self {
        Self {
            table,
            statistics: SearchStatistics::new(PruningPolicy::Exhaustive),
        }
    }

    fn walk(
        &mut self,
        difference: Difference,
        probability: f64,
        rounds_left: usize,
        best: &mut [f64],
    ) {
        self.statistics.nodes_visited += 1;
        if rounds_left == 0 {
            if probability > best[difference] {
                best[difference] = probability;
            }
            return;
        }
        let table = self.table;
        for transition in table.row(difference) {
            self.walk(
                transition.output,
                probability * transition.probability,
                rounds_left - 1,
                best,
            );
        }
    }
}

impl DifferentialSearch for ExhaustiveSearch<'_> {
    fn search(&mut self, start: Difference, rounds: usize) -> Vec<f64> {
        let start_time = Instant::now();
        let mut best = vec![0.0; self.table.blocks()];
        if start < best.len() {
            self.walk(start, 1.0, rounds, &mut best);
        }
        self.statistics.searches += 1;
        self.statistics.elapsed_time += start_time.elapsed();
        best
    }

    fn statistics(&self) -> SearchStatistics {
        self.statistics.clone()
    }

    fn reset(&mut self) {
        self.statistics = SearchStatistics::new(PruningPolicy::Exhaustive);
    }
}
