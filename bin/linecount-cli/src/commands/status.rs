// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `linecount status` command: display what the memory oracle sees.
//!
//! Detects the same source the oracle strategy would use (cgroup v2,
//! cgroup v1, or per-process accounting) and prints its readings, the
//! host's `/proc/meminfo` totals and, inside a cgroup, the most telling
//! `memory.stat` counters.

use memory_budget::format_size;
use memory_oracle::{MemoryInfo, MemoryOracle, MemorySnapshot};
use std::collections::BTreeMap;

/// `memory.stat` counters shown in the text output, v2 and v1 names.
const STAT_HIGHLIGHTS: [&str; 9] = [
    "anon",
    "file",
    "active_file",
    "inactive_file",
    "rss",
    "cache",
    "total_rss",
    "total_cache",
    "total_inactive_file",
];

pub fn execute(json: bool) -> anyhow::Result<()> {
    let oracle = memory_oracle::detect()?;
    let snapshot = MemorySnapshot::capture(oracle.as_ref())?;
    let stats = oracle.memory_stat().unwrap_or_else(|e| {
        tracing::warn!("memory.stat unreadable: {e}");
        BTreeMap::new()
    });
    let system = MemoryInfo::read().ok();

    if json {
        let value = serde_json::json!({
            "snapshot": snapshot,
            "memory_stat": stats,
            "system": system,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           linecount · Memory Status                 ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Oracle ─────────────────────────────────────────────────
    println!("  Oracle ({})", snapshot.source);
    println!("   Usage:        {}", format_size(snapshot.usage_bytes));
    println!("   Working set:  {}", format_size(snapshot.working_set_bytes));
    if snapshot.is_unlimited() {
        println!("   Limit:        unlimited");
    } else {
        println!("   Limit:        {}", format_size(snapshot.limit_bytes));
        println!(
            "   Used:         {:.1}%  {}",
            snapshot.utilisation() * 100.0,
            usage_bar(snapshot.utilisation()),
        );
    }
    println!();

    // ── memory.stat ────────────────────────────────────────────
    let highlights = highlights(&stats);
    if !highlights.is_empty() {
        println!("  memory.stat");
        for (name, value) in highlights {
            println!("   {:<20} {}", name, format_size(value));
        }
        println!();
    }

    // ── System ─────────────────────────────────────────────────
    if let Some(m) = &system {
        println!("  System");
        println!("   Total:        {}", format_size(m.total_bytes));
        println!("   Available:    {}", format_size(m.available_bytes));
        println!(
            "   Used:         {} ({:.1}%)",
            format_size(m.used_bytes),
            m.utilisation() * 100.0,
        );
        println!();
    }

    println!("{}", snapshot.summary());
    Ok(())
}

/// The highlighted counters present in `stats`, in display order.
fn highlights(stats: &BTreeMap<String, u64>) -> Vec<(&'static str, u64)> {
    STAT_HIGHLIGHTS
        .iter()
        .filter_map(|&name| stats.get(name).map(|&v| (name, v)))
        .collect()
}

/// Creates a visual usage bar (0.0-1.0 scale).
fn usage_bar(ratio: f64) -> String {
    let filled = (ratio * 20.0).round() as usize;
    let filled = filled.min(20);
    let empty = 20 - filled;
    let symbol = if ratio >= 0.9 {
        "#"
    } else if ratio >= 0.7 {
        "="
    } else {
        "-"
    };
    format!("[{}{}]", symbol.repeat(filled), ".".repeat(empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_bar() {
        assert_eq!(usage_bar(0.0), format!("[{}]", ".".repeat(20)));
        assert_eq!(usage_bar(0.5), format!("[{}{}]", "-".repeat(10), ".".repeat(10)));
        assert_eq!(usage_bar(1.5), format!("[{}]", "#".repeat(20)));
    }

    #[test]
    fn test_highlights_order_and_filter() {
        let stats: BTreeMap<String, u64> = [("file", 2), ("anon", 1), ("pgfault", 9)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(highlights(&stats), vec![("anon", 1), ("file", 2)]);
    }
}
