//! Configuration for parallel search execution.

use crate::error::{DiffError, Result};
use crate::table::Difference;
use std::time::Duration;

/// Configuration for parallel search execution.
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of worker threads to spawn.
    pub num_workers: usize,
    /// Overall timeout for the parallel search.
    pub timeout: Option<Duration>,
    /// Restrict the starting differences to `[first, end)` (None = all
    /// non-zero differences).
    pub range: Option<(Difference, Difference)>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            timeout: None,
            range: None,
        }
    }
}

impl ParallelConfig {
    /// Create a new parallel config with the specified number of workers.
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    /// Set the overall timeout for parallel search.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the overall timeout from an Option.
    pub fn with_timeout_option(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Only search starting differences in `[first, end)`.
    pub fn with_range(mut self, first: Difference, end: Difference) -> Self {
        self.range = Some((first, end));
        self
    }

    /// Resolve the starting-difference range for a table of `blocks`
    /// differences.
    pub fn resolve_range(&self, blocks: usize) -> Result<(Difference, Difference)> {
        match self.range {
            None => Ok((1, blocks)),
            Some((first, end)) if first < end && end <= blocks => Ok((first, end)),
            Some((first, end)) => Err(DiffError::config(format!(
                "start range [{:#x}, {:#x}) is empty or exceeds the {} table differences",
                first, end, blocks
            ))),
        }
    }
}
