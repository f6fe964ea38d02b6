// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Point-in-time memory snapshot.
//!
//! A [`MemorySnapshot`] gathers the three oracle readings into one struct
//! for logging and CLI display.

use crate::{MemoryOracle, OracleError, UNLIMITED};
use std::time::{SystemTime, UNIX_EPOCH};

/// A complete reading of one [`MemoryOracle`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct MemorySnapshot {
    /// Name of the oracle that produced the readings.
    pub source: String,
    /// Raw usage in bytes.
    pub usage_bytes: u64,
    /// Usage minus reclaimable cache in bytes.
    pub working_set_bytes: u64,
    /// Ceiling in bytes ([`UNLIMITED`] when unbounded).
    pub limit_bytes: u64,
    /// Unix timestamp in milliseconds when the snapshot was taken.
    pub timestamp_ms: u64,
}

impl MemorySnapshot {
    /// Reads usage, working set and limit from `oracle`.
    pub fn capture(oracle: &dyn MemoryOracle) -> Result<Self, OracleError> {
        let usage_bytes = oracle.current_usage()?;
        let working_set_bytes = oracle.working_set()?;
        let limit_bytes = oracle.limit()?;

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Ok(Self {
            source: oracle.name().to_string(),
            usage_bytes,
            working_set_bytes,
            limit_bytes,
            timestamp_ms,
        })
    }

    /// Returns `true` if the source reports no ceiling.
    pub fn is_unlimited(&self) -> bool {
        self.limit_bytes == UNLIMITED
    }

    /// Working set as a fraction of the limit, in `[0.0, 1.0]`.
    pub fn utilisation(&self) -> f64 {
        if self.limit_bytes == 0 || self.is_unlimited() {
            return 0.0;
        }
        (self.working_set_bytes as f64 / self.limit_bytes as f64).min(1.0)
    }

    /// Returns a summary string suitable for logging or CLI display.
    ///
    /// # Example output
    /// ```text
    /// Memory (cgroup-v2): usage 12.00 MiB, working set 9.00 MiB, limit 64.00 MiB (14% used)
    /// ```
    pub fn summary(&self) -> String {
        let limit = if self.is_unlimited() {
            "unlimited".to_string()
        } else {
            memory_budget::format_size(self.limit_bytes)
        };
        format!(
            "Memory ({}): usage {}, working set {}, limit {} ({:.0}% used)",
            self.source,
            memory_budget::format_size(self.usage_bytes),
            memory_budget::format_size(self.working_set_bytes),
            limit,
            self.utilisation() * 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedOracle;

    #[test]
    fn test_capture() {
        let oracle = ScriptedOracle::new(vec![4096], 16384);
        let snap = MemorySnapshot::capture(&oracle).unwrap();
        assert_eq!(snap.source, "scripted");
        assert_eq!(snap.usage_bytes, 4096);
        assert_eq!(snap.limit_bytes, 16384);
        assert!(snap.timestamp_ms > 0);
        assert!((snap.utilisation() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_summary_format() {
        let snap = MemorySnapshot {
            source: "cgroup-v2".into(),
            usage_bytes: 12 << 20,
            working_set_bytes: 9 << 20,
            limit_bytes: 64 << 20,
            timestamp_ms: 1,
        };
        let s = snap.summary();
        assert!(s.contains("cgroup-v2"));
        assert!(s.contains("usage 12.00 MiB"));
        assert!(s.contains("limit 64.00 MiB"));
        assert!(s.contains("14% used"));
    }

    #[test]
    fn test_unlimited() {
        let snap = MemorySnapshot {
            source: "cgroup-v2".into(),
            usage_bytes: 1,
            working_set_bytes: 1,
            limit_bytes: UNLIMITED,
            timestamp_ms: 1,
        };
        assert_eq!(snap.utilisation(), 0.0);
        assert!(snap.summary().contains("limit unlimited"));
    }

    #[test]
    fn test_serialize() {
        let snap = MemorySnapshot::capture(&ScriptedOracle::new(vec![1], 2)).unwrap();
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["usage_bytes"], 1);
        assert_eq!(json["source"], "scripted");
    }
}
