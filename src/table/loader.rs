//! Text format for round tables
//!
//! ```text
//! # one-round table for S-box variant 7
//! blocks 65536
//! denominator 16
//! 0x0001 0x0020 6
//! 0x0001 0x0200 4
//! ```
//!
//! `blocks` must come first. When `denominator` is present every value is an
//! occurrence count and is divided by it; otherwise values are probabilities.
//! Differences may be written in decimal or with a `0x` prefix. Blank lines
//! and `#` comments are ignored.

use crate::error::{DiffError, Result};
use crate::table::{Difference, RoundTable, RoundTableBuilder};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Read and parse a table file
pub fn load_table(path: &Path) -> Result<RoundTable> {
    let source = fs::read_to_string(path)?;
    let table = parse_table(&source)?;
    debug!(
        path = %path.display(),
        blocks = table.blocks(),
        transitions = table.transition_count(),
        "loaded round table"
    );
    Ok(table)
}

/// Parse a table from its text representation
pub fn parse_table(source: &str) -> Result<RoundTable> {
    let mut builder: Option<RoundTableBuilder> = None;
    let mut denominator: Option<f64> = None;
    let mut transitions_read = false;

    for (index, raw) in source.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            ["blocks", value] => {
                if builder.is_some() {
                    return Err(DiffError::parse(line_number, "duplicate 'blocks' directive"));
                }
                let blocks = parse_difference(value)
                    .map_err(|message| DiffError::parse(line_number, message))?;
                builder = Some(
                    RoundTableBuilder::new(blocks)
                        .map_err(|e| DiffError::parse(line_number, e.to_string()))?,
                );
            }
            ["denominator", value] => {
                if transitions_read {
                    return Err(DiffError::parse(
                        line_number,
                        "'denominator' must precede transitions",
                    ));
                }
                let value: u64 = value.parse().map_err(|_| {
                    DiffError::parse(line_number, format!("invalid denominator: {}", value))
                })?;
                if value == 0 {
                    return Err(DiffError::parse(line_number, "denominator must be non-zero"));
                }
                denominator = Some(value as f64);
            }
            [input, output, value] => {
                let builder = builder.as_mut().ok_or_else(|| {
                    DiffError::parse(line_number, "'blocks' must precede transitions")
                })?;
                let input = parse_difference(input)
                    .map_err(|message| DiffError::parse(line_number, message))?;
                let output = parse_difference(output)
                    .map_err(|message| DiffError::parse(line_number, message))?;
                let value: f64 = value.parse().map_err(|_| {
                    DiffError::parse(line_number, format!("invalid value: {}", value))
                })?;
                let probability = match denominator {
                    Some(d) => value / d,
                    None => value,
                };
                builder
                    .insert(input, output, probability)
                    .map_err(|e| DiffError::parse(line_number, e.to_string()))?;
                transitions_read = true;
            }
            _ => {
                return Err(DiffError::parse(
                    line_number,
                    format!("unrecognised line: {}", line),
                ));
            }
        }
    }

    builder
        .ok_or_else(|| DiffError::parse(0, "missing 'blocks' directive"))?
        .build()
}

/// Write `table` in the text format understood by [`parse_table`]
pub fn write_table<W: Write>(table: &RoundTable, out: &mut W) -> Result<()> {
    writeln!(out, "blocks {}", table.blocks())?;
    for input in 0..table.blocks() {
        let mut row = table.row(input).to_vec();
        row.sort_by_key(|t| t.output);
        for transition in row {
            writeln!(
                out,
                "{:#06x} {:#06x} {:e}",
                input, transition.output, transition.probability
            )?;
        }
    }
    Ok(())
}

/// Parse a difference written in decimal or `0x`-prefixed hex
pub fn parse_difference(text: &str) -> std::result::Result<Difference, String> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Difference::from_str_radix(hex, 16)
    } else {
        text.parse::<Difference>()
    };
    parsed.map_err(|_| format!("invalid difference: {}", text))
}
