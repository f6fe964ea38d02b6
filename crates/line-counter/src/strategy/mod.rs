// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`PressureStrategy`] trait and its implementations.
//!
//! | Strategy | Measures | Cost per check | Over budget |
//! |---|---|---|---|
//! | [`ApproximateStrategy`] | running footprint estimate | none | spill or fail |
//! | [`OracleStrategy`] | process / cgroup memory | a few file reads | spill |

pub mod approximate;
pub mod oracle;

pub use approximate::{ApproximateStrategy, ExceedAction};
pub use oracle::OracleStrategy;

use crate::CountError;
use memory_budget::FootprintTracker;

/// Verdict of a pressure check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pressure {
    /// Below the ceiling; keep accumulating.
    Normal,
    /// At or over the ceiling; the resident aggregate must be spilled.
    Spill,
}

/// A pressure check result with the numbers behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assessment {
    pub pressure: Pressure,
    /// What the strategy measured, in bytes.
    pub observed_bytes: u64,
    /// What it compared against, in bytes.
    pub ceiling_bytes: u64,
}

/// Decides, on the check cadence, whether the resident aggregate has to go.
///
/// Strategies see the engine's running footprint estimate and may consult
/// whatever else they own (a memory oracle). They never touch the
/// aggregate themselves.
pub trait PressureStrategy: Send {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    /// Checks the current memory pressure.
    fn assess(&mut self, footprint: &FootprintTracker) -> Result<Assessment, CountError>;
}
