// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The counting engine.
//!
//! ```text
//! lines ──► Accumulator ──(every check_interval)──► PressureStrategy
//!                ▲                                        │ Spill
//!                └──────── take() ◄── SpillManager ◄──────┘
//!
//! finish(): no runs  ──► Counts (resident map)
//!           runs     ──► compact to fan-in ──► RunMerger(runs + resident) ──► Counts
//! ```

use crate::accumulator::Accumulator;
use crate::merge::{RunMerger, Source};
use crate::metrics::{CountMetrics, SpillRecord};
use crate::run::RunHandle;
use crate::spill::{release_memory, SpillManager};
use crate::strategy::{Assessment, Pressure, PressureStrategy};
use crate::{CountError, CounterConfig, Counts};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ── Cancellation ───────────────────────────────────────────────

/// Cooperative cancellation shared between a counter and its controller.
///
/// Checked at every ingestion and before every spill.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ── Engine ─────────────────────────────────────────────────────

/// Counts distinct lines within a memory budget.
///
/// # Example
/// ```
/// use line_counter::{CounterConfig, LineCounter};
///
/// let config = CounterConfig {
///     strategy: "approximate".into(),
///     ..Default::default()
/// };
/// let mut counter = LineCounter::from_config(config)?;
/// counter.count_reader(&b"a\nb\na\n"[..])?;
/// let counts = counter.finish()?.collect_counts()?;
/// assert_eq!(counts, vec![(b"a".to_vec(), 2), (b"b".to_vec(), 1)]);
/// # Ok::<(), line_counter::CountError>(())
/// ```
pub struct LineCounter {
    config: CounterConfig,
    strategy: Box<dyn PressureStrategy>,
    accumulator: Accumulator,
    spills: SpillManager,
    metrics: CountMetrics,
    cancel: CancelFlag,
    report_interval: Option<Duration>,
    last_report: Instant,
    started: Instant,
}

impl LineCounter {
    /// Creates a counter around an explicit strategy.
    ///
    /// Validates the config and prepares the spill directory.
    pub fn new(
        config: CounterConfig,
        strategy: Box<dyn PressureStrategy>,
    ) -> Result<Self, CountError> {
        config.validate()?;
        let spills = SpillManager::new(config.spill_directory.as_deref(), config.keep_runs)?;
        let report_interval = match config.report_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        tracing::info!(
            "line counter created: strategy '{}', check every {} lines, budget {}",
            strategy.name(),
            config.check_interval,
            config.memory_limit_or_default(),
        );

        let now = Instant::now();
        Ok(Self {
            metrics: CountMetrics::new(strategy.name()),
            config,
            strategy,
            accumulator: Accumulator::new(),
            spills,
            cancel: CancelFlag::new(),
            report_interval,
            last_report: now,
            started: now,
        })
    }

    /// Creates a counter with the strategy named in `config`.
    pub fn from_config(config: CounterConfig) -> Result<Self, CountError> {
        let strategy = config.create_strategy()?;
        Self::new(config, strategy)
    }

    /// Handle that cancels this counter from elsewhere.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Replaces the cancellation flag, e.g. with one shared by several counters.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    pub fn metrics(&self) -> &CountMetrics {
        &self.metrics
    }

    /// Runs registered so far.
    pub fn runs(&self) -> &[RunHandle] {
        self.spills.runs()
    }

    /// Distinct keys currently resident.
    pub fn resident_keys(&self) -> usize {
        self.accumulator.len()
    }

    /// Counts one key. Keys must not contain `\n`.
    pub fn ingest(&mut self, key: &[u8]) -> Result<(), CountError> {
        if key.contains(&b'\n') {
            return Err(CountError::InvalidKey(format!(
                "key contains a newline: {:?}",
                String::from_utf8_lossy(key)
            )));
        }
        self.record(key)
    }

    /// Counts one input line, without its trailing `\n` if present.
    pub fn ingest_line(&mut self, line: &[u8]) -> Result<(), CountError> {
        let key = line.strip_suffix(b"\n").unwrap_or(line);
        self.ingest(key)
    }

    /// Counts every line of `reader`. Returns the number of lines read.
    pub fn count_reader<R: BufRead>(&mut self, mut reader: R) -> Result<u64, CountError> {
        let mut line = Vec::new();
        let mut lines = 0;
        loop {
            line.clear();
            let n = reader.read_until(b'\n', &mut line).map_err(CountError::Input)?;
            if n == 0 {
                break;
            }
            self.ingest_line(&line)?;
            lines += 1;
        }
        tracing::debug!("input exhausted after {lines} lines");
        Ok(lines)
    }

    /// Ends ingestion and returns the final counts.
    pub fn finish(self) -> Result<Counts, CountError> {
        self.finish_with_metrics().map(|(counts, _)| counts)
    }

    /// Like [`finish`](Self::finish), also returning the metrics.
    pub fn finish_with_metrics(mut self) -> Result<(Counts, CountMetrics), CountError> {
        if self.cancel.is_cancelled() {
            return Err(CountError::Cancelled);
        }
        self.metrics.ingest_duration = self.started.elapsed();
        tracing::info!("{}", self.metrics.summary());

        if self.spills.run_count() == 0 {
            tracing::debug!(
                "no spills; {} keys served from memory",
                self.accumulator.len()
            );
            return Ok((Counts::resident(self.accumulator.into_map()), self.metrics));
        }

        let resident = self.accumulator.take();
        let reserved = usize::from(!resident.is_empty());
        self.metrics.compaction_passes = self.spills.compact(self.config.merge_fan_in, reserved)?;

        let run_set = self.spills.into_run_set();
        let mut sources = run_set.sources()?;
        if !resident.is_empty() {
            sources.push(Box::new(resident.into_iter().map(Ok::<_, CountError>)) as Source);
        }
        tracing::info!(
            "merging {} runs{}",
            run_set.runs().len(),
            if reserved > 0 { " and resident leftovers" } else { "" },
        );

        let merger = RunMerger::new(sources)?;
        Ok((Counts::merged(merger, run_set), self.metrics))
    }

    // ── Private helpers ────────────────────────────────────────

    fn record(&mut self, key: &[u8]) -> Result<(), CountError> {
        if self.cancel.is_cancelled() {
            return Err(CountError::Cancelled);
        }
        self.accumulator.ingest(key)?;
        self.metrics.lines_ingested += 1;

        if self.metrics.lines_ingested % self.config.check_interval == 0 {
            self.check_pressure()?;
        }
        Ok(())
    }

    fn check_pressure(&mut self) -> Result<(), CountError> {
        let footprint = *self.accumulator.footprint();
        let assessment = self.strategy.assess(&footprint)?;
        self.metrics
            .record_check(footprint.estimated_bytes(), assessment.observed_bytes);
        tracing::debug!(
            "pressure check at line {}: {} / {} bytes ({:?})",
            self.metrics.lines_ingested,
            assessment.observed_bytes,
            assessment.ceiling_bytes,
            assessment.pressure,
        );
        self.maybe_report(&assessment);

        if assessment.pressure == Pressure::Spill {
            self.spill(assessment.observed_bytes)?;
        }
        Ok(())
    }

    fn spill(&mut self, observed_bytes: u64) -> Result<(), CountError> {
        if self.cancel.is_cancelled() {
            return Err(CountError::Cancelled);
        }
        if self.accumulator.is_empty() {
            tracing::debug!("memory pressure with nothing resident; spill skipped");
            return Ok(());
        }

        let start = Instant::now();
        let pairs = self.accumulator.take();
        let Some(run) = self.spills.spill(pairs)? else {
            return Ok(());
        };
        let record = SpillRecord {
            run_id: run.id(),
            at_line: self.metrics.lines_ingested,
            entries: run.entries(),
            file_bytes: run.file_bytes(),
            observed_bytes,
            duration: start.elapsed(),
        };
        release_memory();

        tracing::info!(
            "spilled run {} at line {}: {} keys, {}",
            record.run_id,
            record.at_line,
            record.entries,
            memory_budget::format_size(record.file_bytes),
        );
        self.metrics.record_spill(record);
        Ok(())
    }

    fn maybe_report(&mut self, assessment: &Assessment) {
        let Some(interval) = self.report_interval else {
            return;
        };
        if self.last_report.elapsed() < interval {
            return;
        }
        self.last_report = Instant::now();
        self.metrics.memory_reports += 1;
        tracing::info!(
            lines = self.metrics.lines_ingested,
            resident_keys = self.accumulator.len(),
            estimated_bytes = self.accumulator.footprint().estimated_bytes(),
            observed_bytes = assessment.observed_bytes,
            ceiling_bytes = assessment.ceiling_bytes,
            "memory status: {} observed of {} ceiling, {} runs",
            memory_budget::format_size(assessment.observed_bytes),
            memory_budget::format_size(assessment.ceiling_bytes),
            self.spills.run_count(),
        );
    }
}

impl std::fmt::Debug for LineCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineCounter")
            .field("strategy", &self.strategy.name())
            .field("lines_ingested", &self.metrics.lines_ingested)
            .field("resident_keys", &self.accumulator.len())
            .field("runs", &self.spills.run_count())
            .finish()
    }
}
