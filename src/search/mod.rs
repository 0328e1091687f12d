//! Search for high-probability differential characteristics
//!
//! This module provides:
//! - Branch-and-bound: depth-first search with exact slot dominance and a
//!   tunable bound policy
//! - Exhaustive: unpruned enumeration used as ground truth on small tables
//! - Parallel: a worker pool that hands out starting differences and keeps
//!   the best characteristic per worker

pub mod branch_bound;
pub mod config;
pub mod exhaustive;
pub mod parallel;
pub mod record;
pub mod result;

pub use branch_bound::BranchAndBound;
pub use config::{PruningPolicy, SearchConfig};
pub use exhaustive::ExhaustiveSearch;
pub use parallel::{ParallelConfig, ParallelResult, run_parallel_search};
pub use record::{DiffPairProb, DiffProb, best_ending, ranked_endings};
pub use result::SearchStatistics;

use crate::table::Difference;

/// Trait for engines that compute the best probability of every ending
/// difference reachable from a starting difference
pub trait DifferentialSearch {
    /// Search all characteristics of exactly `rounds` rounds from `start`
    ///
    /// # Returns
    /// A vector indexed by ending difference holding the highest cumulative
    /// probability found for it, `0.0` where nothing was reached
    fn search(&mut self, start: Difference, rounds: usize) -> Vec<f64>;

    /// Get statistics accumulated since construction or the last reset
    fn statistics(&self) -> SearchStatistics;

    /// Reset the accumulated statistics
    fn reset(&mut self);
}
