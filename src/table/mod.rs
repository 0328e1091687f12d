//! One-round difference propagation tables
//!
//! A [`RoundTable`] maps every input difference to the short list of output
//! differences it can propagate to after one cipher round, together with the
//! propagation probability. Zero entries are never stored, so the search
//! engine only ever walks transitions that are actually possible.
//!
//! Tables are built once (from dense rows, occurrence counts, a table file
//! or an SPN description) and are immutable afterwards.

pub mod loader;
pub mod spn;

use crate::error::{DiffError, Result};
use std::collections::BTreeMap;

/// A block difference: the XOR of two related cipher states
pub type Difference = usize;

/// Slack allowed when checking that a row's probabilities sum to at most 1
const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// A single non-zero entry of a table row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// Output difference after one round
    pub output: Difference,
    /// Probability of reaching `output` from the row's input difference
    pub probability: f64,
}

/// Sparse, read-only one-round propagation table
#[derive(Debug, Clone)]
pub struct RoundTable {
    blocks: usize,
    rows: Vec<Vec<Transition>>,
    max_probability: f64,
    transitions: usize,
}

impl RoundTable {
    /// Build a table from a dense `[input][output]` probability matrix
    pub fn from_dense(rows: &[Vec<f64>]) -> Result<Self> {
        let mut builder = RoundTableBuilder::new(rows.len())?;
        for (input, row) in rows.iter().enumerate() {
            if row.len() != rows.len() {
                return Err(DiffError::table(format!(
                    "row {:#x} has {} entries, expected {}",
                    input,
                    row.len(),
                    rows.len()
                )));
            }
            for (output, &probability) in row.iter().enumerate() {
                builder.insert(input, output, probability)?;
            }
        }
        builder.build()
    }

    /// Build a table from occurrence counts: each count is divided by
    /// `denominator` (the number of input pairs tried per input difference)
    pub fn from_counts(rows: &[Vec<u64>], denominator: u64) -> Result<Self> {
        if denominator == 0 {
            return Err(DiffError::table("count denominator must be non-zero"));
        }
        let dense: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&count| count as f64 / denominator as f64)
                    .collect()
            })
            .collect();
        Self::from_dense(&dense)
    }

    /// Number of representable differences (`N`)
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Non-zero transitions out of `input`, most probable first.
    ///
    /// Differences outside the table yield an empty row.
    pub fn row(&self, input: Difference) -> &[Transition] {
        self.rows.get(input).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Probability of `input` propagating to `output` in one round
    pub fn probability(&self, input: Difference, output: Difference) -> f64 {
        self.row(input)
            .iter()
            .find(|t| t.output == output)
            .map_or(0.0, |t| t.probability)
    }

    /// Largest single-round probability anywhere in the table
    pub fn max_probability(&self) -> f64 {
        self.max_probability
    }

    /// Total number of stored (non-zero) transitions
    pub fn transition_count(&self) -> usize {
        self.transitions
    }

    /// Number of input differences with at least one transition
    pub fn active_rows(&self) -> usize {
        self.rows.iter().filter(|row| !row.is_empty()).count()
    }
}

/// Incremental builder that validates entries and produces a [`RoundTable`]
#[derive(Debug)]
pub struct RoundTableBuilder {
    blocks: usize,
    rows: Vec<BTreeMap<Difference, f64>>,
}

impl RoundTableBuilder {
    /// Start a table over `blocks` differences; `blocks` must be a power of
    /// two no smaller than 2
    pub fn new(blocks: usize) -> Result<Self> {
        if blocks < 2 || !blocks.is_power_of_two() {
            return Err(DiffError::table(format!(
                "block count {} is not a power of two >= 2",
                blocks
            )));
        }
        Ok(Self {
            blocks,
            rows: vec![BTreeMap::new(); blocks],
        })
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Record one transition. Zero probabilities are accepted and dropped.
    pub fn insert(&mut self, input: Difference, output: Difference, probability: f64) -> Result<()> {
        if input >= self.blocks || output >= self.blocks {
            return Err(DiffError::table(format!(
                "transition {:#x} -> {:#x} is outside a {}-difference table",
                input, output, self.blocks
            )));
        }
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(DiffError::table(format!(
                "probability {} for {:#x} -> {:#x} is outside [0, 1]",
                probability, input, output
            )));
        }
        if probability == 0.0 {
            return Ok(());
        }
        if self.rows[input].insert(output, probability).is_some() {
            return Err(DiffError::table(format!(
                "duplicate transition {:#x} -> {:#x}",
                input, output
            )));
        }
        Ok(())
    }

    /// Validate row sums and freeze the table
    pub fn build(self) -> Result<RoundTable> {
        let mut rows = Vec::with_capacity(self.blocks);
        let mut max_probability: f64 = 0.0;
        let mut transitions = 0;

        for (input, entries) in self.rows.into_iter().enumerate() {
            let sum: f64 = entries.values().sum();
            if sum > 1.0 + ROW_SUM_TOLERANCE {
                return Err(DiffError::table(format!(
                    "row {:#x} sums to {}, above 1",
                    input, sum
                )));
            }

            let mut row: Vec<Transition> = entries
                .into_iter()
                .map(|(output, probability)| Transition {
                    output,
                    probability,
                })
                .collect();
            // Most probable first so pruning policies see strong paths early;
            // output difference breaks ties for a reproducible traversal.
            row.sort_by(|a, b| {
                b.probability
                    .total_cmp(&a.probability)
                    .then(a.output.cmp(&b.output))
            });

            if let Some(first) = row.first() {
                max_probability = max_probability.max(first.probability);
            }
            transitions += row.len();
            rows.push(row);
        }

        Ok(RoundTable {
            blocks: self.blocks,
            rows,
            max_probability,
            transitions,
        })
    }
}
