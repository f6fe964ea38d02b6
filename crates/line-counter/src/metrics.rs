// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Counting metrics.
//!
//! [`CountMetrics`] records what the ingestion loop did: how many lines it
//! saw, how often it checked pressure, and every spill. They are the main
//! tool for comparing pressure strategies on the same input.

use std::time::Duration;

/// One spill to disk.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SpillRecord {
    /// Id of the run that was written.
    pub run_id: u64,
    /// Lines ingested when the spill was triggered.
    pub at_line: u64,
    /// Distinct keys written.
    pub entries: u64,
    /// Size of the run file in bytes.
    pub file_bytes: u64,
    /// Reading that triggered the spill, in bytes.
    pub observed_bytes: u64,
    /// Time spent writing the run.
    pub duration: Duration,
}

/// Aggregate metrics for one count.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CountMetrics {
    /// Name of the pressure strategy.
    pub strategy: String,
    /// Lines ingested.
    pub lines_ingested: u64,
    /// Pressure checks performed.
    pub pressure_checks: u64,
    /// Periodic memory status reports emitted.
    pub memory_reports: u64,
    /// Every spill, in order.
    pub spills: Vec<SpillRecord>,
    /// Runs produced by fan-in compaction.
    pub compaction_passes: usize,
    /// Highest footprint estimate seen at a check.
    pub peak_estimated_bytes: u64,
    /// Highest strategy reading seen at a check.
    pub peak_observed_bytes: u64,
    /// Time spent ingesting, spills included.
    pub ingest_duration: Duration,
    /// Time spent writing runs.
    pub spill_duration: Duration,
}

impl CountMetrics {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Default::default()
        }
    }

    /// Records one pressure check.
    pub fn record_check(&mut self, estimated_bytes: u64, observed_bytes: u64) {
        self.pressure_checks += 1;
        self.peak_estimated_bytes = self.peak_estimated_bytes.max(estimated_bytes);
        self.peak_observed_bytes = self.peak_observed_bytes.max(observed_bytes);
    }

    /// Records one completed spill.
    pub fn record_spill(&mut self, record: SpillRecord) {
        self.spill_duration += record.duration;
        self.spills.push(record);
    }

    pub fn spill_count(&self) -> usize {
        self.spills.len()
    }

    /// Total bytes written to run files by spills.
    pub fn spilled_bytes(&self) -> u64 {
        self.spills.iter().map(|s| s.file_bytes).sum()
    }

    /// Lines per second over the ingestion phase.
    pub fn lines_per_second(&self) -> f64 {
        let secs = self.ingest_duration.as_secs_f64();
        if secs <= 0.0 || self.lines_ingested == 0 {
            return 0.0;
        }
        self.lines_ingested as f64 / secs
    }

    /// Serialises the metrics as pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Count ({}): {} lines in {:.2}ms ({:.0} lines/s), {} checks, \
             {} spills ({} written, {:.2}ms), {} compactions, \
             peak estimate {}, peak observed {}",
            self.strategy,
            self.lines_ingested,
            self.ingest_duration.as_secs_f64() * 1000.0,
            self.lines_per_second(),
            self.pressure_checks,
            self.spill_count(),
            memory_budget::format_size(self.spilled_bytes()),
            self.spill_duration.as_secs_f64() * 1000.0,
            self.compaction_passes,
            memory_budget::format_size(self.peak_estimated_bytes),
            memory_budget::format_size(self.peak_observed_bytes),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spill(run_id: u64, file_bytes: u64, millis: u64) -> SpillRecord {
        SpillRecord {
            run_id,
            at_line: run_id * 10,
            entries: 1,
            file_bytes,
            observed_bytes: 100,
            duration: Duration::from_millis(millis),
        }
    }

    #[test]
    fn test_empty_metrics() {
        let m = CountMetrics::new("approximate");
        assert_eq!(m.lines_per_second(), 0.0);
        assert_eq!(m.spill_count(), 0);
        assert_eq!(m.strategy, "approximate");
    }

    #[test]
    fn test_record_check_keeps_peaks() {
        let mut m = CountMetrics::new("oracle");
        m.record_check(100, 5000);
        m.record_check(300, 2000);
        assert_eq!(m.pressure_checks, 2);
        assert_eq!(m.peak_estimated_bytes, 300);
        assert_eq!(m.peak_observed_bytes, 5000);
    }

    #[test]
    fn test_record_spill() {
        let mut m = CountMetrics::new("oracle");
        m.record_spill(spill(1, 1024, 3));
        m.record_spill(spill(2, 2048, 4));
        assert_eq!(m.spill_count(), 2);
        assert_eq!(m.spilled_bytes(), 3072);
        assert_eq!(m.spill_duration, Duration::from_millis(7));
    }

    #[test]
    fn test_summary_format() {
        let mut m = CountMetrics::new("approximate");
        m.lines_ingested = 1000;
        m.ingest_duration = Duration::from_millis(10);
        m.record_spill(spill(1, 1536, 1));

        let s = m.summary();
        assert!(s.contains("Count (approximate):"));
        assert!(s.contains("1000 lines"));
        assert!(s.contains("1 spills (1.50 KiB written"));
    }

    #[test]
    fn test_to_json() {
        let mut m = CountMetrics::new("oracle");
        m.record_spill(spill(4, 10, 1));
        let json: serde_json::Value = serde_json::from_str(&m.to_json().unwrap()).unwrap();
        assert_eq!(json["strategy"], "oracle");
        assert_eq!(json["spills"][0]["run_id"], 4);
    }
}
