// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `linecount count` command: count distinct lines of a file or stdin.
//!
//! Pairs go to stdout as `line - count`, in ascending line order or, with
//! `--top`, most frequent first. Logs and statistics go to stderr.

use anyhow::Context;
use line_counter::{CountMetrics, CounterConfig, Counts, LineCounter};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, clap::Args)]
pub struct CountArgs {
    /// Input file, or `-` for stdin.
    #[arg(short, long)]
    pub filename: String,

    /// Memory budget (e.g., "10M", "512k"). Also caps the oracle's limit.
    #[arg(short, long)]
    pub memory_limit: Option<String>,

    /// Pressure strategy: approximate or oracle.
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Fraction of the limit the oracle strategy lets usage reach.
    #[arg(long)]
    pub occupancy: Option<f64>,

    /// Lines between memory pressure checks.
    #[arg(long)]
    pub check_interval: Option<u64>,

    /// Directory for run files (a private temporary directory by default).
    #[arg(long)]
    pub spill_dir: Option<PathBuf>,

    /// Keep run files after counting.
    #[arg(long)]
    pub keep_runs: bool,

    /// Seconds between memory status reports; 0 disables them.
    #[arg(long)]
    pub report_interval: Option<f64>,

    /// Print only the N most frequent lines.
    #[arg(long)]
    pub top: Option<usize>,

    /// Print counting statistics to stderr.
    #[arg(long)]
    pub stats: bool,

    /// Print statistics as JSON (implies --stats).
    #[arg(long)]
    pub json: bool,
}

impl CountArgs {
    /// Applies the options given on the command line on top of `config`.
    pub fn apply(&self, mut config: CounterConfig) -> anyhow::Result<CounterConfig> {
        if let Some(limit) = &self.memory_limit {
            config.memory_limit = Some(limit.clone());
        }
        if let Some(strategy) = &self.strategy {
            config.strategy = strategy.clone();
        }
        if let Some(occupancy) = self.occupancy {
            config.occupancy_fraction = occupancy;
        }
        if let Some(interval) = self.check_interval {
            config.check_interval = interval;
        }
        if let Some(dir) = &self.spill_dir {
            config.spill_directory = Some(dir.clone());
        }
        if self.keep_runs {
            config.keep_runs = true;
        }
        if let Some(secs) = self.report_interval {
            anyhow::ensure!(
                secs.is_finite() && secs >= 0.0,
                "report interval must be a non-negative number of seconds, got {secs}"
            );
            config.report_interval_ms = (secs * 1000.0).round() as u64;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn execute(config_path: Option<&Path>, args: CountArgs) -> anyhow::Result<()> {
    let base = match config_path {
        Some(path) => CounterConfig::from_file(path)?,
        None => CounterConfig::default(),
    };
    let config = args.apply(base)?;
    tracing::info!(
        "counting '{}' with strategy '{}', limit {}",
        args.filename,
        config.strategy,
        config.memory_limit_or_default(),
    );

    let mut counter = LineCounter::from_config(config)?;
    let input = open_input(&args.filename)?;
    counter.count_reader(input)?;
    let (counts, metrics) = counter.finish_with_metrics()?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match args.top {
        Some(n) => {
            for (key, count) in counts.most_common(n)? {
                write_pair(&mut out, &key, count)?;
            }
        }
        None => write_all(&mut out, counts)?,
    }
    out.flush()?;

    if args.stats || args.json {
        print_stats(&metrics, args.json)?;
    }
    Ok(())
}

fn open_input(filename: &str) -> anyhow::Result<Box<dyn BufRead>> {
    if filename == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(filename).with_context(|| format!("cannot open input '{filename}'"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn write_all<W: Write>(out: &mut W, counts: Counts) -> anyhow::Result<()> {
    for pair in counts {
        let (key, count) = pair?;
        write_pair(out, &key, count)?;
    }
    Ok(())
}

/// Writes one `line - count` record; the line is emitted byte for byte.
pub fn write_pair<W: Write>(out: &mut W, key: &[u8], count: u64) -> io::Result<()> {
    out.write_all(key)?;
    writeln!(out, " - {count}")
}

fn print_stats(metrics: &CountMetrics, json: bool) -> anyhow::Result<()> {
    if json {
        eprintln!("{}", metrics.to_json()?);
    } else {
        eprintln!("{}", metrics.summary());
        for spill in &metrics.spills {
            eprintln!(
                "  run {:>4} at line {:>10}: {} keys, {}, {:.2}ms",
                spill.run_id,
                spill.at_line,
                spill.entries,
                memory_budget::format_size(spill.file_bytes),
                spill.duration.as_secs_f64() * 1000.0,
            );
        }
    }
    Ok(())
}
