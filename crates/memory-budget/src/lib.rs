// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-budget
//!
//! Memory budgets and footprint accounting for the bounded-memory line
//! counter.
//!
//! # Key Components
//!
//! - [`MemoryBudget`]: a hard memory ceiling with human-readable parsing
//!   (`"10m"`, `"3.02 MiB"`, `"1G"`, etc.).
//! - [`parse_size`] / [`format_size`]: the size conversions used by the
//!   CLI and configuration layer.
//! - [`FootprintTracker`]: a running byte-cost estimate of an in-memory
//!   aggregate, maintained incrementally on insert and reset on spill.
//!
//! # Example
//! ```
//! use memory_budget::{FootprintTracker, MemoryBudget};
//!
//! let budget = MemoryBudget::parse("1k").unwrap();
//! let mut footprint = FootprintTracker::new();
//! for key in ["alpha", "beta", "gamma"] {
//!     footprint.record_insert(key.len());
//! }
//! assert!(!footprint.exceeds(budget));
//! ```

mod budget;
mod error;
mod footprint;
mod size;

pub use budget::MemoryBudget;
pub use error::BudgetError;
pub use footprint::{FootprintTracker, ENTRY_OVERHEAD_BYTES, MAP_OVERHEAD_BYTES};
pub use size::{format_size, parse_size};
