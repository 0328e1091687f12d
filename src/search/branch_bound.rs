//! Branch-and-bound search over multi-round differential characteristics
//!
//! The search explores a tree whose levels are cipher rounds and whose nodes
//! are (difference, accumulated probability) pairs, starting from the chosen
//! input difference with probability 1. Children of a node are the non-zero
//! entries of its table row, so the sparse table directly bounds the fan-out.
//!
//! Two kinds of pruning keep the tree small:
//!
//! 1. **Slot dominance** (always on, exact). For every round and difference
//!    the engine remembers the best probability that reached it. A child that
//!    does not strictly improve its slot is dropped: whatever it could reach,
//!    the earlier arrival already reached with at least the same probability.
//!    The slots of the final round are the search result.
//! 2. **Policy bound** (see [`PruningPolicy`]). The accumulated probability
//!    times `max_probability ^ rounds_left` bounds every completion of a
//!    path; the policy decides when that bound is too weak to continue.

use crate::search::config::PruningPolicy;
use crate::search::result::SearchStatistics;
use crate::search::DifferentialSearch;
use crate::table::{Difference, RoundTable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::debug;

/// Reusable branch-and-bound engine bound to one read-only table.
///
/// Scratch buffers are kept between searches, so a worker should create one
/// engine and reuse it for every starting difference it claims.
pub struct BranchAndBound<'t> {
    table: &'t RoundTable,
    pruning: PruningPolicy,
    /// `levels[k][d]`: best probability that reached `d` after `k` rounds
    levels: Vec<Vec<f64>>,
    /// Slots written by the current search, cleared by the next one
    touched: Vec<(usize, Difference)>,
    /// `bound_factors[r]`: `max_probability ^ r`
    bound_factors: Vec<f64>,
    /// Best non-zero ending probability of the current search
    best_so_far: f64,
    statistics: SearchStatistics,
}

impl<'t> BranchAndBound<'t> {
    pub fn new(table: &'t RoundTable) -> Self {
        Self::with_pruning(table, PruningPolicy::default())
    }

    pub fn with_pruning(table: &'t RoundTable, pruning: PruningPolicy) -> Self {
        Self {
            table,
            pruning,
            levels: Vec::new(),
            touched: Vec::new(),
            bound_factors: Vec::new(),
            best_so_far: 0.0,
            statistics: SearchStatistics::new(pruning),
        }
    }

    pub fn pruning(&self) -> PruningPolicy {
        self.pruning
    }

    pub fn table(&self) -> &'t RoundTable {
        self.table
    }

    /// Like [`DifferentialSearch::search`], but gives up as soon as `stop`
    /// is raised. The flag is checked once per expanded node, i.e. between
    /// tree levels. Returns `None` when the search was interrupted.
    pub fn search_with_stop(
        &mut self,
        start: Difference,
        rounds: usize,
        stop: &AtomicBool,
    ) -> Option<Vec<f64>> {
        let (probabilities, completed) = self.run(start, rounds, Some(stop));
        completed.then_some(probabilities)
    }

    fn run(
        &mut self,
        start: Difference,
        rounds: usize,
        stop: Option<&AtomicBool>,
    ) -> (Vec<f64>, bool) {
        let start_time = Instant::now();
        let blocks = self.table.blocks();
        self.prepare(rounds);

        let completed = if start < blocks {
            self.levels[0][start] = 1.0;
            self.touched.push((0, start));
            if rounds == 0 && start != 0 {
                self.best_so_far = 1.0;
            }
            self.descend(start, 1.0, 0, rounds, stop)
        } else {
            true
        };

        self.statistics.searches += 1;
        if !completed {
            self.statistics.interrupted += 1;
        }
        let elapsed = start_time.elapsed();
        self.statistics.elapsed_time += elapsed;
        debug!(
            start,
            rounds,
            best = self.best_so_far,
            completed,
            elapsed_ms = elapsed.as_millis() as u64,
            "branch-and-bound search finished"
        );

        (self.levels[rounds].clone(), completed)
    }

    /// Size and clear the scratch buffers for a search of `rounds` rounds
    fn prepare(&mut self, rounds: usize) {
        let blocks = self.table.blocks();
        for (level, difference) in self.touched.drain(..) {
            if let Some(slots) = self.levels.get_mut(level) {
                slots[difference] = 0.0;
            }
        }
        self.levels.resize_with(rounds + 1, || vec![0.0; blocks]);

        let max_probability = self.table.max_probability();
        self.bound_factors = (0..=rounds)
            .map(|r| max_probability.powi(r as i32))
            .collect();
        self.best_so_far = 0.0;
    }

    /// Expand the node `difference` reached with `probability` after `depth`
    /// rounds. Returns `false` if the search was stopped.
    fn descend(
        &mut self,
        difference: Difference,
        probability: f64,
        depth: usize,
        rounds: usize,
        stop: Option<&AtomicBool>,
    ) -> bool {
        self.statistics.nodes_visited += 1;
        if depth == rounds {
            return true;
        }
        if stop.is_some_and(|s| s.load(Ordering::Relaxed)) {
            return false;
        }

        let table = self.table;
        let child_depth = depth + 1;
        let rounds_left = rounds - child_depth;

        for transition in table.row(difference) {
            let child = probability * transition.probability;
            let output = transition.output;

            // First arrival wins ties
            if child <= self.levels[child_depth][output] {
                self.statistics.pruned_by_dominance += 1;
                continue;
            }

            let bound = child * self.bound_factors[rounds_left];
            if self.pruning.prunes(bound, self.best_so_far) {
                self.statistics.pruned_by_bound += 1;
                continue;
            }

            if self.levels[child_depth][output] == 0.0 {
                self.touched.push((child_depth, output));
            }
            self.levels[child_depth][output] = child;
            if rounds_left == 0 && output != 0 && child > self.best_so_far {
                self.best_so_far = child;
            }

            if !self.descend(output, child, child_depth, rounds, stop) {
                return false;
            }
        }

        true
    }
}

impl DifferentialSearch for BranchAndBound<'_> {
    fn search(&mut self, start: Difference, rounds: usize) -> Vec<f64> {
        self.run(start, rounds, None).0
    }

    fn statistics(&self) -> SearchStatistics {
        self.statistics.clone()
    }

    fn reset(&mut self) {
        self.statistics = SearchStatistics::new(self.pruning);
    }
}
