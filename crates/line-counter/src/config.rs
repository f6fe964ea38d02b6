// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Counter configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! memory_limit = "64M"
//! strategy = "oracle"
//! occupancy_fraction = 0.8
//! check_interval = 1024
//! spill_directory = "/var/tmp/linecount"
//! on_exceed = "spill"
//! use_working_set = true
//! merge_fan_in = 64
//! keep_runs = false
//! report_interval_ms = 1000
//! ```

use crate::strategy::{ApproximateStrategy, ExceedAction, OracleStrategy, PressureStrategy};
use crate::CountError;
use memory_budget::MemoryBudget;
use memory_oracle::MemoryOracle;
use std::path::{Path, PathBuf};

/// Budget of the approximate strategy when `memory_limit` is unset.
pub const DEFAULT_MEMORY_LIMIT: &str = "10M";

/// Configuration for a [`LineCounter`](crate::LineCounter).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Memory budget (human-readable, e.g. `"10M"`). The approximate
    /// strategy enforces it directly, falling back to
    /// [`DEFAULT_MEMORY_LIMIT`] when unset. The oracle strategy caps the
    /// oracle's own limit with it only when it is set.
    pub memory_limit: Option<String>,
    /// Pressure strategy name: `"approximate"` or `"oracle"`.
    pub strategy: String,
    /// Fraction of the limit the oracle strategy lets usage reach.
    pub occupancy_fraction: f64,
    /// Ingestions between pressure checks.
    pub check_interval: u64,
    /// Where run files are created; a private temporary directory if unset.
    pub spill_directory: Option<PathBuf>,
    /// What the approximate strategy does when over budget: `"spill"` or `"fail"`.
    pub on_exceed: String,
    /// Whether the oracle strategy compares the working set instead of raw usage.
    pub use_working_set: bool,
    /// Maximum number of sources merged at once.
    pub merge_fan_in: usize,
    /// Keep run files on disk after the result is dropped.
    pub keep_runs: bool,
    /// Minimum delay between memory status reports; `0` disables them.
    pub report_interval_ms: u64,
}

impl CounterConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CountError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CountError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, CountError> {
        toml::from_str(toml_str).map_err(|e| CountError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, CountError> {
        toml::to_string_pretty(self)
            .map_err(|e| CountError::Config(format!("TOML serialise error: {e}")))
    }

    /// The configured memory limit, or [`DEFAULT_MEMORY_LIMIT`].
    pub fn memory_limit_or_default(&self) -> &str {
        self.memory_limit.as_deref().unwrap_or(DEFAULT_MEMORY_LIMIT)
    }

    /// Parses the effective memory limit into a [`MemoryBudget`].
    pub fn parse_budget(&self) -> Result<MemoryBudget, CountError> {
        Ok(MemoryBudget::parse(self.memory_limit_or_default())?)
    }

    /// The explicit memory limit, if one was configured.
    pub fn budget_cap(&self) -> Result<Option<MemoryBudget>, CountError> {
        self.memory_limit
            .as_deref()
            .map(|limit| MemoryBudget::parse(limit).map_err(CountError::from))
            .transpose()
    }

    /// Parses `on_exceed`.
    pub fn exceed_action(&self) -> Result<ExceedAction, CountError> {
        match self.on_exceed.to_lowercase().as_str() {
            "spill" => Ok(ExceedAction::Spill),
            "fail" => Ok(ExceedAction::Fail),
            other => Err(CountError::Config(format!(
                "unknown on_exceed '{other}'; expected 'spill' or 'fail'"
            ))),
        }
    }

    /// Checks every numeric option against its valid range.
    pub fn validate(&self) -> Result<(), CountError> {
        self.parse_budget()?;
        self.exceed_action()?;
        if !(self.occupancy_fraction > 0.0 && self.occupancy_fraction < 1.0) {
            return Err(CountError::Config(format!(
                "occupancy_fraction must be in (0, 1), got {}",
                self.occupancy_fraction
            )));
        }
        if self.check_interval == 0 {
            return Err(CountError::Config("check_interval must be positive".into()));
        }
        if self.merge_fan_in < 2 {
            return Err(CountError::Config(format!(
                "merge_fan_in must be at least 2, got {}",
                self.merge_fan_in
            )));
        }
        Ok(())
    }

    /// Creates the pressure strategy specified by this config.
    ///
    /// For `"oracle"`, the best available memory source is detected; an
    /// inaccessible one fails here, before any input is read.
    pub fn create_strategy(&self) -> Result<Box<dyn PressureStrategy>, CountError> {
        match self.strategy.to_lowercase().as_str() {
            "oracle" => {
                let oracle = memory_oracle::detect()?;
                self.create_strategy_with_oracle(oracle)
            }
            _ => self.approximate_strategy(),
        }
    }

    /// Creates the configured strategy around an explicit oracle.
    ///
    /// The oracle is ignored by the approximate strategy.
    pub fn create_strategy_with_oracle(
        &self,
        oracle: Box<dyn MemoryOracle>,
    ) -> Result<Box<dyn PressureStrategy>, CountError> {
        match self.strategy.to_lowercase().as_str() {
            "oracle" => {
                let mut strategy = OracleStrategy::new(oracle, self.occupancy_fraction)?
                    .with_working_set(self.use_working_set);
                if let Some(cap) = self.budget_cap()? {
                    strategy = strategy.with_budget_cap(cap);
                }
                Ok(Box::new(strategy))
            }
            _ => self.approximate_strategy(),
        }
    }

    fn approximate_strategy(&self) -> Result<Box<dyn PressureStrategy>, CountError> {
        match self.strategy.to_lowercase().as_str() {
            "approximate" | "estimate" => Ok(Box::new(ApproximateStrategy::new(
                self.parse_budget()?,
                self.exceed_action()?,
            ))),
            other => Err(CountError::Config(format!(
                "unknown strategy '{other}'; expected 'approximate' or 'oracle'"
            ))),
        }
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            memory_limit: None,
            strategy: "oracle".to_string(),
            occupancy_fraction: 0.8,
            check_interval: 1024,
            spill_directory: None,
            on_exceed: "spill".to_string(),
            use_working_set: true,
            merge_fan_in: 64,
            keep_runs: false,
            report_interval_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_oracle::ScriptedOracle;

    #[test]
    fn test_default() {
        let c = CounterConfig::default();
        assert_eq!(c.memory_limit, None);
        assert_eq!(c.parse_budget().unwrap(), MemoryBudget::from_mb(10));
        assert_eq!(c.budget_cap().unwrap(), None);
        assert_eq!(c.strategy, "oracle");
        assert_eq!(c.check_interval, 1024);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_parse_budget() {
        let c = CounterConfig {
            memory_limit: Some("256M".into()),
            ..Default::default()
        };
        assert_eq!(c.parse_budget().unwrap().as_mb(), 256);
        assert_eq!(c.budget_cap().unwrap(), Some(MemoryBudget::from_mb(256)));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
memory_limit = "1G"
strategy = "approximate"
check_interval = 64
spill_directory = "/tmp/runs"
on_exceed = "fail"
keep_runs = true
"#;
        let c = CounterConfig::from_toml(toml).unwrap();
        assert_eq!(c.memory_limit.as_deref(), Some("1G"));
        assert_eq!(c.strategy, "approximate");
        assert_eq!(c.check_interval, 64);
        assert_eq!(c.spill_directory, Some(PathBuf::from("/tmp/runs")));
        assert_eq!(c.exceed_action().unwrap(), ExceedAction::Fail);
        assert!(c.keep_runs);
        // Unspecified keys keep their defaults.
        assert_eq!(c.merge_fan_in, 64);
        assert!((c.occupancy_fraction - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(matches!(
            CounterConfig::from_toml("check_interval = \"often\""),
            Err(CountError::Config(_))
        ));
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = CounterConfig {
            spill_directory: Some(PathBuf::from("/tmp/x")),
            ..Default::default()
        };
        let toml = c.to_toml().unwrap();
        let back = CounterConfig::from_toml(&toml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.toml");
        std::fs::write(&path, "strategy = \"approximate\"\n").unwrap();
        let c = CounterConfig::from_file(&path).unwrap();
        assert_eq!(c.strategy, "approximate");

        let missing = CounterConfig::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(CountError::Config(_))));
    }

    #[test]
    fn test_validate_ranges() {
        let bad = [
            CounterConfig { occupancy_fraction: 0.0, ..Default::default() },
            CounterConfig { occupancy_fraction: 1.0, ..Default::default() },
            CounterConfig { check_interval: 0, ..Default::default() },
            CounterConfig { merge_fan_in: 1, ..Default::default() },
            CounterConfig { on_exceed: "panic".into(), ..Default::default() },
        ];
        for c in bad {
            assert!(matches!(c.validate(), Err(CountError::Config(_))), "{c:?}");
        }
        let zero = CounterConfig { memory_limit: Some("0".into()), ..Default::default() };
        assert!(matches!(zero.validate(), Err(CountError::Budget(_))));
    }

    #[test]
    fn test_create_strategy_approximate() {
        let c = CounterConfig {
            strategy: "approximate".into(),
            ..Default::default()
        };
        assert_eq!(c.create_strategy().unwrap().name(), "approximate");
    }

    #[test]
    fn test_create_strategy_oracle() {
        let c = CounterConfig::default();
        let s = c
            .create_strategy_with_oracle(Box::new(ScriptedOracle::new(vec![0], 1 << 30)))
            .unwrap();
        assert_eq!(s.name(), "oracle");
    }

    #[test]
    fn test_oracle_cap_only_when_limit_set() {
        let oracle = || Box::new(ScriptedOracle::new(vec![600 << 20], 1 << 30));
        let footprint = memory_budget::FootprintTracker::new();

        // The oracle's own limit governs by default: 600 MiB of group usage
        // stays under 0.8 × 1 GiB even with almost nothing resident.
        let mut default = CounterConfig::default()
            .create_strategy_with_oracle(oracle())
            .unwrap();
        let a = default.assess(&footprint).unwrap();
        assert_eq!(a.pressure, crate::Pressure::Normal);
        assert_eq!(a.ceiling_bytes, MemoryBudget::from_gb(1).scaled(0.8));

        let capped = CounterConfig {
            memory_limit: Some("10M".into()),
            ..Default::default()
        };
        let mut capped = capped.create_strategy_with_oracle(oracle()).unwrap();
        let a = capped.assess(&footprint).unwrap();
        assert_eq!(a.pressure, crate::Pressure::Spill);
        assert_eq!(a.ceiling_bytes, MemoryBudget::from_mb(10).scaled(0.8));
    }

    #[test]
    fn test_create_strategy_oracle_unavailable() {
        let c = CounterConfig::default();
        let result = c.create_strategy_with_oracle(Box::new(ScriptedOracle::unavailable()));
        assert!(matches!(result, Err(CountError::OracleUnavailable(_))));
    }

    #[test]
    fn test_create_strategy_unknown() {
        let c = CounterConfig {
            strategy: "bogus".into(),
            ..Default::default()
        };
        assert!(matches!(c.create_strategy(), Err(CountError::Config(_))));
    }
}
