// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `linecount generate` command: write a synthetic input file.
//!
//! Each line is a random integer in `[0, num_elements)`. Lines are written
//! until the file reaches at least the requested size, so a small
//! `num_elements` yields a large file with few distinct lines.

use anyhow::Context;
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn execute(num_elements: u64, size: &str, filename: &Path) -> anyhow::Result<()> {
    anyhow::ensure!(num_elements > 0, "num-elements must be positive");
    let target = memory_budget::parse_size(size)
        .map_err(|e| anyhow::anyhow!("invalid size '{size}': {e}"))?;
    tracing::info!(
        "generating {} of integers in [0, {num_elements}) into {}",
        memory_budget::format_size(target),
        filename.display(),
    );

    let file = File::create(filename)
        .with_context(|| format!("cannot create '{}'", filename.display()))?;
    let mut out = BufWriter::new(file);
    let total = write_random_lines(&mut out, &mut rand::rng(), num_elements, target)?;
    out.flush()?;

    println!("{total} bytes written to {}", filename.display());
    Ok(())
}

/// Writes random integers, one per line, until at least `target` bytes.
/// Returns the number of bytes written.
pub fn write_random_lines<W: Write, R: Rng>(
    out: &mut W,
    rng: &mut R,
    num_elements: u64,
    target: u64,
) -> std::io::Result<u64> {
    let mut total = 0u64;
    let mut line = String::new();
    while total < target {
        line.clear();
        let value = rng.random_range(0..num_elements);
        line.push_str(&value.to_string());
        line.push('\n');
        out.write_all(line.as_bytes())?;
        total += line.len() as u64;
    }
    Ok(total)
}
