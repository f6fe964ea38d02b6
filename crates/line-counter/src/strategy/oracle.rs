// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Oracle-backed pressure strategy.
//!
//! Asks a [`MemoryOracle`] what the process actually uses and spills once
//! that crosses a fraction of the effective limit:
//!
//! ```text
//! ceiling = min(oracle.limit(), budget cap) * occupancy_fraction
//! ```
//!
//! The working set (usage minus reclaimable page cache) is compared by
//! default. Page cache from writing run files would otherwise count
//! against the limit and trigger back-to-back spills.
//!
//! The footprint estimate is ignored: unlike [`ApproximateStrategy`]
//! this sees every allocation in the process.
//!
//! [`ApproximateStrategy`]: super::ApproximateStrategy

use super::{Assessment, Pressure, PressureStrategy};
use crate::CountError;
use memory_budget::{FootprintTracker, MemoryBudget};
use memory_oracle::{MemoryOracle, UNLIMITED};

/// Spills when observed usage exceeds a fraction of the limit.
pub struct OracleStrategy {
    oracle: Box<dyn MemoryOracle>,
    oracle_limit: u64,
    budget_cap: Option<MemoryBudget>,
    fraction: f64,
    use_working_set: bool,
}

impl OracleStrategy {
    /// Wraps `oracle`, reading its limit once up front.
    ///
    /// Fails with [`CountError::OracleUnavailable`] if the oracle cannot
    /// be read, and with [`CountError::Config`] if `fraction` is outside
    /// `(0, 1)`.
    pub fn new(oracle: Box<dyn MemoryOracle>, fraction: f64) -> Result<Self, CountError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(CountError::Config(format!(
                "occupancy fraction must be in (0, 1), got {fraction}"
            )));
        }
        let oracle_limit = oracle.limit()?;
        if oracle_limit == UNLIMITED {
            tracing::warn!(
                oracle = oracle.name(),
                "memory oracle reports no limit; only the budget cap bounds spilling"
            );
        }
        tracing::debug!(oracle = oracle.name(), limit = oracle_limit, "memory oracle probed");

        Ok(Self {
            oracle,
            oracle_limit,
            budget_cap: None,
            fraction,
            use_working_set: true,
        })
    }

    /// Caps the oracle's limit with an explicit budget.
    pub fn with_budget_cap(mut self, budget: MemoryBudget) -> Self {
        self.budget_cap = Some(budget);
        self
    }

    /// Chooses between working set (`true`) and raw usage (`false`).
    pub fn with_working_set(mut self, enabled: bool) -> Self {
        self.use_working_set = enabled;
        self
    }

    /// Usage above which a spill is requested.
    pub fn ceiling_bytes(&self) -> u64 {
        let limit = match self.budget_cap {
            Some(cap) => self.oracle_limit.min(cap.as_bytes()),
            None => self.oracle_limit,
        };
        if limit == UNLIMITED {
            return UNLIMITED;
        }
        MemoryBudget::from_bytes(limit).scaled(self.fraction)
    }

    pub fn oracle(&self) -> &dyn MemoryOracle {
        self.oracle.as_ref()
    }
}

impl std::fmt::Debug for OracleStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleStrategy")
            .field("oracle", &self.oracle.name())
            .field("oracle_limit", &self.oracle_limit)
            .field("budget_cap", &self.budget_cap)
            .field("fraction", &self.fraction)
            .field("use_working_set", &self.use_working_set)
            .finish()
    }
}

impl PressureStrategy for OracleStrategy {
    fn name(&self) -> &str {
        "oracle"
    }

    fn assess(&mut self, _footprint: &FootprintTracker) -> Result<Assessment, CountError> {
        let usage = if self.use_working_set {
            self.oracle.working_set()?
        } else {
            self.oracle.current_usage()?
        };
        let ceiling = self.ceiling_bytes();
        let pressure = if usage > ceiling {
            Pressure::Spill
        } else {
            Pressure::Normal
        };

        Ok(Assessment {
            pressure,
            observed_bytes: usage,
            ceiling_bytes: ceiling,
        })
    }
}
