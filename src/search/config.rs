//! Configuration types for the characteristic search

use crate::error::{DiffError, Result};

/// Default number of rounds covered by a characteristic
pub const DEFAULT_ROUNDS: usize = 5;

/// Extra pruning applied on top of the always-on slot dominance check
///
/// The bound of a partial path is its accumulated probability times the
/// table's largest single-round probability raised to the number of rounds
/// still to go: no completion of the path can do better.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PruningPolicy {
    /// No extra pruning; every ending difference gets its exact maximum
    #[default]
    Exhaustive,
    /// Abandon paths whose bound cannot beat the best non-zero ending found
    /// so far. The overall maximum stays exact, weaker endings may be
    /// under-reported.
    BestSoFar,
    /// Abandon paths whose bound falls below a fixed probability
    Threshold(f64),
}

impl PruningPolicy {
    /// Whether a path with the given bound should be abandoned
    pub fn prunes(&self, bound: f64, best_so_far: f64) -> bool {
        match *self {
            PruningPolicy::Exhaustive => false,
            PruningPolicy::BestSoFar => bound <= best_so_far,
            PruningPolicy::Threshold(threshold) => bound < threshold,
        }
    }

    /// Whether every non-zero ending probability is reported exactly
    pub fn is_exact(&self) -> bool {
        matches!(self, PruningPolicy::Exhaustive)
    }
}

impl std::fmt::Display for PruningPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruningPolicy::Exhaustive => write!(f, "exhaustive"),
            PruningPolicy::BestSoFar => write!(f, "best-so-far"),
            PruningPolicy::Threshold(t) => write!(f, "threshold:{:e}", t),
        }
    }
}

impl std::str::FromStr for PruningPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_lowercase().replace('_', "-");
        if let Some(value) = lower.strip_prefix("threshold:") {
            let threshold: f64 = value
                .parse()
                .map_err(|_| format!("Invalid threshold: '{}'", value))?;
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(format!("Threshold {} must lie in (0, 1]", threshold));
            }
            return Ok(PruningPolicy::Threshold(threshold));
        }
        match lower.as_str() {
            "exhaustive" | "exact" | "none" => Ok(PruningPolicy::Exhaustive),
            "best-so-far" | "best" | "bound" => Ok(PruningPolicy::BestSoFar),
            _ => Err(format!(
                "Unknown pruning policy: '{}'. Valid options: exhaustive, best-so-far, threshold:<p>",
                s
            )),
        }
    }
}

/// Main search configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Number of rounds the characteristic spans
    pub rounds: usize,
    /// Pruning policy layered on top of slot dominance
    pub pruning: PruningPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            pruning: PruningPolicy::default(),
        }
    }
}

impl SearchConfig {
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_pruning(mut self, pruning: PruningPolicy) -> Self {
        self.pruning = pruning;
        self
    }

    /// Reject configurations the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        if let PruningPolicy::Threshold(t) = self.pruning {
            if !(t > 0.0 && t <= 1.0) {
                return Err(DiffError::config(format!(
                    "pruning threshold {} must lie in (0, 1]",
                    t
                )));
            }
        }
        Ok(())
    }
}
