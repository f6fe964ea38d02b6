// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A deterministic oracle that replays scripted readings.

use crate::{MemoryOracle, OracleError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Script {
    readings: Vec<u64>,
    limit: u64,
    available: bool,
    cursor: AtomicUsize,
}

/// Replays a fixed sequence of usage readings against a fixed limit.
///
/// Each [`current_usage`](MemoryOracle::current_usage) call consumes the
/// next reading; once the script is exhausted the last reading repeats.
/// Clones share the script, so a test can keep a handle after moving the
/// oracle into a consumer and inspect how often it was read.
///
/// ```
/// use memory_oracle::{MemoryOracle, ScriptedOracle};
///
/// let oracle = ScriptedOracle::new(vec![10, 90], 100);
/// assert_eq!(oracle.current_usage().unwrap(), 10);
/// assert_eq!(oracle.current_usage().unwrap(), 90);
/// assert_eq!(oracle.current_usage().unwrap(), 90);
/// assert_eq!(oracle.reads(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedOracle {
    script: Arc<Script>,
}

impl ScriptedOracle {
    pub fn new(readings: Vec<u64>, limit: u64) -> Self {
        Self {
            script: Arc::new(Script {
                readings,
                limit,
                available: true,
                cursor: AtomicUsize::new(0),
            }),
        }
    }

    /// An oracle whose every read fails, as on a platform without
    /// memory accounting.
    pub fn unavailable() -> Self {
        Self {
            script: Arc::new(Script {
                readings: Vec::new(),
                limit: 0,
                available: false,
                cursor: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of usage readings taken so far.
    pub fn reads(&self) -> usize {
        self.script.cursor.load(Ordering::Acquire)
    }

    fn check_available(&self) -> Result<(), OracleError> {
        if self.script.available {
            Ok(())
        } else {
            Err(OracleError::NotAvailable {
                path: "<scripted>".to_string(),
            })
        }
    }
}

impl MemoryOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    fn current_usage(&self) -> Result<u64, OracleError> {
        self.check_available()?;
        let i = self.script.cursor.fetch_add(1, Ordering::AcqRel);
        let readings = &self.script.readings;
        Ok(readings
            .get(i)
            .or_else(|| readings.last())
            .copied()
            .unwrap_or(0))
    }

    fn limit(&self) -> Result<u64, OracleError> {
        self.check_available()?;
        Ok(self.script.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_script_reads_zero() {
        let oracle = ScriptedOracle::new(vec![], 100);
        assert_eq!(oracle.current_usage().unwrap(), 0);
        assert_eq!(oracle.limit().unwrap(), 100);
    }

    #[test]
    fn test_clones_share_cursor() {
        let oracle = ScriptedOracle::new(vec![1, 2, 3], 100);
        let handle = oracle.clone();
        assert_eq!(oracle.current_usage().unwrap(), 1);
        assert_eq!(handle.current_usage().unwrap(), 2);
        assert_eq!(oracle.reads(), 2);
    }

    #[test]
    fn test_unavailable() {
        let oracle = ScriptedOracle::unavailable();
        assert!(matches!(oracle.limit(), Err(OracleError::NotAvailable { .. })));
        assert!(oracle.current_usage().is_err());
        assert_eq!(oracle.reads(), 0);
    }
}
