//! Round tables derived from an SPN round description
//!
//! One round of a substitution-permutation network applies `sbox_count`
//! parallel copies of a small S-box followed by a bit permutation. Because
//! XOR differences pass through the permutation deterministically, the
//! one-round propagation probability of a block difference is the product of
//! the S-box difference distribution table (DDT) entries of its active
//! S-boxes, with the output difference permuted afterwards.

use crate::error::{DiffError, Result};
use crate::table::{Difference, RoundTable, RoundTableBuilder};
use tracing::info;

/// S-box of the Heys tutorial cipher
pub const HEYS_SBOX: [u8; 16] = [
    0xE, 0x4, 0xD, 0x1, 0x2, 0xF, 0xB, 0x8, 0x3, 0xA, 0x6, 0xC, 0x5, 0x9, 0x0, 0x7,
];

/// Widest block this module will expand into a full table
const MAX_BLOCK_BITS: usize = 24;

/// Description of one SPN round: S-box layer then bit permutation
#[derive(Debug, Clone)]
pub struct SpnLayer {
    sbox: Vec<u8>,
    sbox_bits: usize,
    sbox_count: usize,
    /// `permutation[i]` is the output position of input bit `i`
    permutation: Vec<usize>,
}

impl SpnLayer {
    pub fn new(
        sbox: Vec<u8>,
        sbox_bits: usize,
        sbox_count: usize,
        permutation: Vec<usize>,
    ) -> Result<Self> {
        if sbox_bits == 0 || sbox_count == 0 || sbox_bits * sbox_count > MAX_BLOCK_BITS {
            return Err(DiffError::config(format!(
                "{} S-boxes of {} bits do not form a block of 1..={} bits",
                sbox_count, sbox_bits, MAX_BLOCK_BITS
            )));
        }
        let sbox_size = 1usize << sbox_bits;
        if sbox.len() != sbox_size {
            return Err(DiffError::config(format!(
                "S-box has {} entries, expected {}",
                sbox.len(),
                sbox_size
            )));
        }
        if let Some(&bad) = sbox.iter().find(|&&v| v as usize >= sbox_size) {
            return Err(DiffError::config(format!(
                "S-box value {:#x} does not fit in {} bits",
                bad, sbox_bits
            )));
        }

        let block_bits = sbox_bits * sbox_count;
        let mut seen = vec![false; block_bits];
        if permutation.len() != block_bits {
            return Err(DiffError::config(format!(
                "permutation has {} positions, expected {}",
                permutation.len(),
                block_bits
            )));
        }
        for &target in &permutation {
            if target >= block_bits || seen[target] {
                return Err(DiffError::config(format!(
                    "permutation is not a bijection on {} bits",
                    block_bits
                )));
            }
            seen[target] = true;
        }

        Ok(Self {
            sbox,
            sbox_bits,
            sbox_count,
            permutation,
        })
    }

    /// Heys-style round: four 4-bit S-boxes, bit `j` of S-box `i` moves to
    /// bit `i` of S-box `j`
    pub fn heys(sbox: Vec<u8>) -> Result<Self> {
        let permutation = (0..16).map(|bit| (bit % 4) * 4 + bit / 4).collect();
        Self::new(sbox, 4, 4, permutation)
    }

    pub fn block_bits(&self) -> usize {
        self.sbox_bits * self.sbox_count
    }

    pub fn blocks(&self) -> usize {
        1 << self.block_bits()
    }

    /// Difference distribution table: `ddt[a][b]` counts inputs `x` with
    /// `S(x) ^ S(x ^ a) == b`
    pub fn ddt(&self) -> Vec<Vec<u32>> {
        let size = 1usize << self.sbox_bits;
        let mut ddt = vec![vec![0u32; size]; size];
        for x in 0..size {
            let y = self.sbox[x] as usize;
            for (a, row) in ddt.iter_mut().enumerate() {
                let b = y ^ self.sbox[x ^ a] as usize;
                row[b] += 1;
            }
        }
        ddt
    }

    /// Apply the bit permutation to a block difference
    pub fn permute(&self, value: Difference) -> Difference {
        self.permutation
            .iter()
            .enumerate()
            .filter(|&(bit, _)| (value >> bit) & 1 == 1)
            .fold(0, |acc, (_, &target)| acc | (1 << target))
    }

    /// Expand the round into a full [`RoundTable`]. Transitions whose
    /// probability falls below `min_probability` are left out, which keeps
    /// wide tables small at the cost of dropping weak paths.
    pub fn round_table(&self, min_probability: f64) -> Result<RoundTable> {
        let sbox_size = 1usize << self.sbox_bits;
        let mask = sbox_size - 1;
        let scale = sbox_size as f64;

        let ddt_rows: Vec<Vec<(Difference, f64)>> = self
            .ddt()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .enumerate()
                    .filter(|&(_, count)| count > 0)
                    .map(|(out, count)| (out, count as f64 / scale))
                    .collect()
            })
            .collect();

        let mut builder = RoundTableBuilder::new(self.blocks())?;
        let mut partial: Vec<(Difference, f64)> = Vec::new();
        let mut next: Vec<(Difference, f64)> = Vec::new();

        for input in 0..self.blocks() {
            partial.clear();
            partial.push((0, 1.0));

            for index in 0..self.sbox_count {
                let shift = index * self.sbox_bits;
                let nibble = (input >> shift) & mask;
                next.clear();
                for &(acc, p) in &partial {
                    for &(out, q) in &ddt_rows[nibble] {
                        let probability = p * q;
                        // Remaining factors are at most 1, so a partial
                        // product below the floor can never recover.
                        if probability >= min_probability {
                            next.push((acc | out << shift, probability));
                        }
                    }
                }
                std::mem::swap(&mut partial, &mut next);
            }

            for &(output, probability) in &partial {
                builder.insert(input, self.permute(output), probability)?;
            }
        }

        let table = builder.build()?;
        info!(
            blocks = table.blocks(),
            transitions = table.transition_count(),
            max_probability = table.max_probability(),
            "built SPN round table"
        );
        Ok(table)
    }
}

/// Parse an S-box from hex digits: either one compact string such as
/// `E4D12FB83A6C5907` or separated values such as `0xE,0x4,...`
pub fn parse_sbox(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let separated = text.contains(|c: char| c == ',' || c.is_whitespace());

    let values: std::result::Result<Vec<u8>, _> = if separated {
        text.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| {
                let s = s.trim_start_matches("0x").trim_start_matches("0X");
                u8::from_str_radix(s, 16)
            })
            .collect()
    } else {
        text.chars()
            .map(|c| u8::from_str_radix(&c.to_string(), 16))
            .collect()
    };

    let values = values.map_err(|e| DiffError::config(format!("invalid S-box '{}': {}", text, e)))?;
    if values.is_empty() {
        return Err(DiffError::config("empty S-box"));
    }
    Ok(values)
}
