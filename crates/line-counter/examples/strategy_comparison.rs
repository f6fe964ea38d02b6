// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Compare pressure strategies on a synthetic input.
//!
//! The same lines are counted under several budgets with the approximate
//! strategy, then with the oracle strategy on whatever memory source the
//! host offers. Results are identical; spills and timings differ.
//!
//! ```bash
//! cargo run -p line-counter --example strategy_comparison
//! ```

use line_counter::{ApproximateStrategy, CounterConfig, LineCounter, PressureStrategy};
use memory_budget::MemoryBudget;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let input = synthetic_input(200_000, 20_000);
    println!("Input: {} lines, {} bytes\n", 200_000, input.len());

    println!(
        "{:<12} {:>12} {:>8} {:>12} {:>10}",
        "Strategy", "Budget", "Spills", "Peak est.", "Time ms",
    );
    println!("{}", "-".repeat(58));

    let budgets = [
        MemoryBudget::from_kb(256),
        MemoryBudget::from_mb(1),
        MemoryBudget::from_mb(64),
    ];
    let mut reference = None;

    for budget in budgets {
        let strategy = Box::new(ApproximateStrategy::spilling(budget));
        let (top, line) = run(&input, strategy, &budget.to_string())?;
        println!("{line}");
        match &reference {
            None => reference = Some(top),
            Some(r) => assert_eq!(r, &top, "strategies disagree"),
        }
    }

    let config = CounterConfig {
        memory_limit: Some("64M".into()),
        ..Default::default()
    };
    match config.create_strategy() {
        Ok(strategy) => {
            let (top, line) = run(&input, strategy, "64M cap")?;
            println!("{line}");
            if let Some(r) = &reference {
                assert_eq!(r, &top, "strategies disagree");
            }
        }
        Err(e) => println!("{:<12} {:>12} FAIL: {e}", "oracle", "64M cap"),
    }

    if let Some(top) = reference {
        println!("\nMost common:");
        for (key, count) in top {
            println!("{} - {count}", String::from_utf8_lossy(&key));
        }
    }
    Ok(())
}

type Top = Vec<(Vec<u8>, u64)>;

fn run(
    input: &[u8],
    strategy: Box<dyn PressureStrategy>,
    budget_label: &str,
) -> Result<(Top, String), Box<dyn std::error::Error>> {
    let name = strategy.name().to_string();
    let config = CounterConfig {
        check_interval: 1024,
        report_interval_ms: 0,
        ..Default::default()
    };
    let mut counter = LineCounter::new(config, strategy)?;
    counter.count_reader(input)?;
    let (counts, metrics) = counter.finish_with_metrics()?;
    let top = counts.most_common(5)?;

    let line = format!(
        "{:<12} {:>12} {:>8} {:>12} {:>10.2}",
        name,
        budget_label,
        metrics.spill_count(),
        memory_budget::format_size(metrics.peak_estimated_bytes),
        metrics.ingest_duration.as_secs_f64() * 1000.0,
    );
    Ok((top, line))
}

fn synthetic_input(lines: usize, distinct: u64) -> Vec<u8> {
    // Skewed: low values are far more frequent.
    (0..lines as u64)
        .flat_map(|i| {
            let v = (i * i + 7 * i) % distinct;
            format!("{}\n", v % (1 + v % 97)).into_bytes()
        })
        .collect()
}
