// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Footprint-estimate pressure strategy.
//!
//! Compares the engine's [`FootprintTracker`] estimate against a fixed
//! budget. No system calls, so it is cheap and fully deterministic, but it
//! only sees the aggregate: memory used elsewhere in the process is
//! invisible to it.

use super::{Assessment, Pressure, PressureStrategy};
use crate::CountError;
use memory_budget::{FootprintTracker, MemoryBudget};

/// What to do when the estimate exceeds the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceedAction {
    /// Spill the aggregate to a run and keep going.
    Spill,
    /// Abort with [`CountError::OutOfBudget`].
    Fail,
}

/// Budget check against the estimated footprint.
#[derive(Debug, Clone)]
pub struct ApproximateStrategy {
    budget: MemoryBudget,
    action: ExceedAction,
}

impl ApproximateStrategy {
    pub fn new(budget: MemoryBudget, action: ExceedAction) -> Self {
        Self { budget, action }
    }

    /// A strategy that spills whenever the estimate exceeds `budget`.
    pub fn spilling(budget: MemoryBudget) -> Self {
        Self::new(budget, ExceedAction::Spill)
    }

    pub fn budget(&self) -> MemoryBudget {
        self.budget
    }
}

impl PressureStrategy for ApproximateStrategy {
    fn name(&self) -> &str {
        "approximate"
    }

    fn assess(&mut self, footprint: &FootprintTracker) -> Result<Assessment, CountError> {
        let estimated = footprint.estimated_bytes();
        let budget_bytes = self.budget.as_bytes();

        let pressure = if footprint.exceeds(self.budget) {
            match self.action {
                ExceedAction::Spill => Pressure::Spill,
                ExceedAction::Fail => {
                    return Err(CountError::OutOfBudget {
                        estimated_bytes: estimated,
                        budget_bytes,
                    })
                }
            }
        } else {
            Pressure::Normal
        };

        Ok(Assessment {
            pressure,
            observed_bytes: estimated,
            ceiling_bytes: budget_bytes,
        })
    }
}
