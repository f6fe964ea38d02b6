// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # line-counter
//!
//! Counts distinct lines of an arbitrarily large input while staying
//! within a memory budget.
//!
//! Lines are aggregated in a sorted in-memory map. Every `check_interval`
//! lines a [`PressureStrategy`] decides whether the map is too big; if so
//! it is written out as a sorted run file and cleared. At the end, all
//! runs and whatever is still resident are combined by a streaming k-way
//! merge into one sorted sequence of `(key, count)` pairs.
//!
//! # Strategies
//! - [`ApproximateStrategy`]: estimated footprint against a fixed budget.
//! - [`OracleStrategy`]: actual process or cgroup usage from a
//!   [`memory_oracle::MemoryOracle`].
//!
//! # Example
//! ```no_run
//! use line_counter::{CounterConfig, LineCounter};
//!
//! # fn main() -> Result<(), line_counter::CountError> {
//! let config = CounterConfig::from_file("linecount.toml".as_ref())?;
//! let mut counter = LineCounter::from_config(config)?;
//! counter.count_reader(std::io::stdin().lock())?;
//! for pair in counter.finish()? {
//!     let (key, count) = pair?;
//!     println!("{} - {count}", String::from_utf8_lossy(&key));
//! }
//! # Ok(())
//! # }
//! ```

mod accumulator;
mod config;
mod engine;
mod error;
mod merge;
mod metrics;
mod run;
mod spill;
pub mod strategy;
mod view;

pub use accumulator::Accumulator;
pub use config::{CounterConfig, DEFAULT_MEMORY_LIMIT};
pub use engine::{CancelFlag, LineCounter};
pub use error::CountError;
pub use merge::{RunMerger, Source};
pub use metrics::{CountMetrics, SpillRecord};
pub use run::{RunHandle, RunReader, RunWriter};
pub use spill::{release_memory, RunSet, SpillManager};
pub use strategy::{
    ApproximateStrategy, Assessment, ExceedAction, OracleStrategy, Pressure, PressureStrategy,
};
pub use view::Counts;

/// A key with its count.
pub type Entry = (Vec<u8>, u64);

/// An [`Entry`] or the error that ended the sequence.
pub type EntryResult = Result<Entry, CountError>;
