//! Empirical estimation of a differential through an encryption oracle

use crate::error::{DiffError, Result};
use crate::oracle::BlockOracle;
use rand::Rng;
use std::fmt;
use tracing::info;

/// Observed frequency of a differential over random plaintext pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifferentialEstimate {
    pub input_difference: u16,
    pub output_difference: u16,
    /// Number of plaintext pairs encrypted
    pub samples: usize,
    /// Pairs whose ciphertext difference matched
    pub hits: usize,
}

impl DifferentialEstimate {
    /// Fraction of pairs that followed the differential
    pub fn probability(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.hits as f64 / self.samples as f64
        }
    }
}

impl fmt::Display for DifferentialEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a = {:#06x}, b = {:#06x}: {}/{} pairs (p ~ {:.8})",
            self.input_difference,
            self.output_difference,
            self.hits,
            self.samples,
            self.probability()
        )
    }
}

/// Encrypt `samples` random pairs `(x, x ^ input_difference)` in one oracle
/// call and count how many ciphertext pairs differ by `output_difference`.
///
/// The randomness source is supplied by the caller, so a seeded generator
/// makes the estimate reproducible.
pub fn estimate_differential<O, R>(
    oracle: &O,
    input_difference: u16,
    output_difference: u16,
    samples: usize,
    key: Option<&[u16]>,
    rng: &mut R,
) -> Result<DifferentialEstimate>
where
    O: BlockOracle + ?Sized,
    R: Rng,
{
    if samples == 0 {
        return Err(DiffError::config("at least one sample pair is required"));
    }

    let mut blocks = Vec::with_capacity(samples * 2);
    for _ in 0..samples {
        let x: u16 = rng.random();
        blocks.push(x);
        blocks.push(x ^ input_difference);
    }

    let encrypted = oracle.encrypt(&blocks, key)?;
    if encrypted.len() != blocks.len() {
        return Err(DiffError::oracle(format!(
            "oracle returned {} blocks for {} plaintexts",
            encrypted.len(),
            blocks.len()
        )));
    }

    let hits = encrypted
        .chunks_exact(2)
        .filter(|pair| pair[0] ^ pair[1] == output_difference)
        .count();

    let estimate = DifferentialEstimate {
        input_difference,
        output_difference,
        samples,
        hits,
    };
    info!("empirical differential: {}", estimate);
    Ok(estimate)
}
