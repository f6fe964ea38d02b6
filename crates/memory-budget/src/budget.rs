// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The byte ceiling a counter must stay under.

use crate::size::{GIB, KIB, MIB};
use crate::{format_size, parse_size, BudgetError};
use std::fmt;

/// A non-zero memory ceiling in bytes.
///
/// The approximate strategy compares its footprint estimate against it
/// directly; the oracle strategy uses it to cap whatever limit the host
/// reports. Parsing goes through [`parse_size`] and rejects zero, so
/// `"10m"`, `"10 MiB"` and `"10485760"` are all the same budget.
///
/// ```
/// use memory_budget::MemoryBudget;
///
/// let budget: MemoryBudget = "10m".parse().unwrap();
/// assert_eq!(budget, MemoryBudget::from_mb(10));
/// assert_eq!(budget.to_string(), "10.00 MiB");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct MemoryBudget {
    bytes: u64,
}

impl MemoryBudget {
    pub fn from_bytes(bytes: u64) -> Self {
        Self { bytes }
    }

    pub fn from_kb(kb: u64) -> Self {
        Self::from_bytes(kb.saturating_mul(KIB))
    }

    pub fn from_mb(mb: u64) -> Self {
        Self::from_bytes(mb.saturating_mul(MIB))
    }

    pub fn from_gb(gb: u64) -> Self {
        Self::from_bytes(gb.saturating_mul(GIB))
    }

    pub fn as_bytes(&self) -> u64 {
        self.bytes
    }

    /// Whole mebibytes, rounded down.
    pub fn as_mb(&self) -> u64 {
        self.bytes / MIB
    }

    /// `fraction` of the budget in bytes, with `fraction` clamped to `[0, 1]`.
    pub fn scaled(&self, fraction: f64) -> u64 {
        (self.bytes as f64 * fraction.clamp(0.0, 1.0)) as u64
    }

    /// Parses a size string such as `"512k"` or `"1.5 GiB"`.
    pub fn parse(s: &str) -> Result<Self, BudgetError> {
        match parse_size(s)? {
            0 => Err(BudgetError::ZeroBudget),
            bytes => Ok(Self::from_bytes(bytes)),
        }
    }
}

impl std::str::FromStr for MemoryBudget {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_size(self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_constructors_agree() {
        assert_eq!(MemoryBudget::from_kb(1024), MemoryBudget::from_mb(1));
        assert_eq!(MemoryBudget::from_mb(3072), MemoryBudget::from_gb(3));
        assert_eq!(MemoryBudget::from_gb(1).as_mb(), 1024);
        assert_eq!(MemoryBudget::from_bytes(MIB + MIB / 2).as_mb(), 1);
    }

    #[test]
    fn test_constructors_saturate() {
        assert_eq!(MemoryBudget::from_gb(u64::MAX).as_bytes(), u64::MAX);
    }

    #[test]
    fn test_parse_spellings() {
        for text in ["10m", "10M", "10MB", "10 MiB", "10485760"] {
            assert_eq!(MemoryBudget::parse(text).unwrap(), MemoryBudget::from_mb(10), "{text}");
        }
        assert_eq!(MemoryBudget::parse("3.02 MiB").unwrap().as_bytes(), 3166699);
    }

    #[test]
    fn test_parse_rejects() {
        assert_eq!(MemoryBudget::parse("0k"), Err(BudgetError::ZeroBudget));
        assert!(matches!(
            MemoryBudget::parse("ten megs"),
            Err(BudgetError::InvalidFormat(_))
        ));
        assert!(matches!(
            "-5m".parse::<MemoryBudget>(),
            Err(BudgetError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_scaled_clamps() {
        let budget = MemoryBudget::from_bytes(2000);
        assert_eq!(budget.scaled(0.25), 500);
        assert_eq!(budget.scaled(2.0), 2000);
        assert_eq!(budget.scaled(-0.1), 0);
    }

    #[test]
    fn test_ordering() {
        assert!(MemoryBudget::from_kb(900) < MemoryBudget::from_mb(1));
    }

    #[test]
    fn test_serde_as_plain_bytes() {
        let budget = MemoryBudget::from_kb(4);
        assert_eq!(serde_json::to_string(&budget).unwrap(), "4096");
        let back: MemoryBudget = serde_json::from_str("4096").unwrap();
        assert_eq!(back, budget);
    }
}
