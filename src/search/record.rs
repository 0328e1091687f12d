//! Value types for search results

use crate::table::Difference;
use std::cmp::Ordering;
use std::fmt;

/// A difference together with its accumulated probability
///
/// Ordered by probability descending, ties by difference ascending, so a
/// sorted `Vec<DiffProb>` lists the strongest characteristic first.
#[derive(Debug, Clone, Copy)]
pub struct DiffProb {
    pub difference: Difference,
    pub probability: f64,
}

impl DiffProb {
    pub fn new(difference: Difference, probability: f64) -> Self {
        Self {
            difference,
            probability,
        }
    }
}

impl PartialEq for DiffProb {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DiffProb {}

impl PartialOrd for DiffProb {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiffProb {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .probability
            .total_cmp(&self.probability)
            .then(self.difference.cmp(&other.difference))
    }
}

impl fmt::Display for DiffProb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x} (p = {:.8})", self.difference, self.probability)
    }
}

/// Best full characteristic found for one starting difference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffPairProb {
    pub start: Difference,
    pub end: Difference,
    pub probability: f64,
}

impl DiffPairProb {
    pub fn new(start: Difference, end: Difference, probability: f64) -> Self {
        Self {
            start,
            end,
            probability,
        }
    }

    /// Pair a starting difference with the best ending found for it
    pub fn from_ending(start: Difference, ending: DiffProb) -> Self {
        Self::new(start, ending.difference, ending.probability)
    }

    /// Keep whichever of `current` and `candidate` is strictly more probable,
    /// preferring the incumbent on ties
    pub fn fold_best(current: Option<DiffPairProb>, candidate: DiffPairProb) -> DiffPairProb {
        match current {
            Some(best) if best.probability >= candidate.probability => best,
            _ => candidate,
        }
    }
}

impl fmt::Display for DiffPairProb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a = {:#06x}, b = {:#06x}, p = {:.8}",
            self.start, self.end, self.probability
        )
    }
}

/// Most probable non-zero ending difference in a search result.
///
/// The zero difference carries no information and is skipped. The lowest
/// difference wins ties. Returns `None` when nothing non-zero is reachable.
pub fn best_ending(probabilities: &[f64]) -> Option<DiffProb> {
    let mut best: Option<DiffProb> = None;
    for (difference, &probability) in probabilities.iter().enumerate().skip(1) {
        if probability <= 0.0 {
            continue;
        }
        if best.is_none_or(|b| probability > b.probability) {
            best = Some(DiffProb::new(difference, probability));
        }
    }
    best
}

/// All reachable non-zero ending differences, strongest first
pub fn ranked_endings(probabilities: &[f64]) -> Vec<DiffProb> {
    let mut ranked: Vec<DiffProb> = probabilities
        .iter()
        .enumerate()
        .skip(1)
        .filter(|&(_, &p)| p > 0.0)
        .map(|(difference, &probability)| DiffProb::new(difference, probability))
        .collect();
    ranked.sort();
    ranked
}
