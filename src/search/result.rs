//! Search statistics

use crate::search::config::PruningPolicy;
use std::time::Duration;

/// Counters collected while exploring the characteristic tree
#[derive(Debug, Clone, Default)]
pub struct SearchStatistics {
    /// Pruning policy in effect
    pub policy: PruningPolicy,
    /// Total time spent searching
    pub elapsed_time: Duration,
    /// Number of starting differences searched
    pub searches: u64,
    /// Tree nodes expanded (including terminal nodes)
    pub nodes_visited: u64,
    /// Children abandoned because their slot already held an equal or
    /// better probability
    pub pruned_by_dominance: u64,
    /// Children abandoned by the pruning policy's bound
    pub pruned_by_bound: u64,
    /// Number of searches interrupted by a stop request
    pub interrupted: u64,
}

impl SearchStatistics {
    pub fn new(policy: PruningPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Add another set of counters into this one
    pub fn merge(&mut self, other: &SearchStatistics) {
        self.elapsed_time += other.elapsed_time;
        self.searches += other.searches;
        self.nodes_visited += other.nodes_visited;
        self.pruned_by_dominance += other.pruned_by_dominance;
        self.pruned_by_bound += other.pruned_by_bound;
        self.interrupted += other.interrupted;
    }

    /// Fraction of generated children that were pruned (0.0 to 1.0)
    pub fn prune_rate(&self) -> f64 {
        let pruned = self.pruned_by_dominance + self.pruned_by_bound;
        let generated = pruned + self.nodes_visited;
        if generated == 0 {
            0.0
        } else {
            pruned as f64 / generated as f64
        }
    }

    /// Get nodes visited per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.nodes_visited as f64 / secs
        }
    }

    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Pruning policy: {}\n", self.policy));
        s.push_str(&format!("Time: {:.2?}\n", self.elapsed_time));
        s.push_str(&format!("Starting differences: {}\n", self.searches));
        s.push_str(&format!("Nodes visited: {}\n", self.nodes_visited));
        s.push_str(&format!("Throughput: {:.0} nodes/sec\n", self.throughput()));
        s.push_str(&format!(
            "Pruned: {} by dominance, {} by bound ({:.2}%)\n",
            self.pruned_by_dominance,
            self.pruned_by_bound,
            self.prune_rate() * 100.0
        ));
        if self.interrupted > 0 {
            s.push_str(&format!("Interrupted searches: {}\n", self.interrupted));
        }
        s
    }
}
