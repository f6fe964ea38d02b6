// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-process accounting via procfs.

use crate::cgroup::read_value_file;
use crate::meminfo::{find_kb_field, MEMINFO_PATH};
use crate::{MemoryInfo, MemoryOracle, OracleError};
use std::path::PathBuf;

const SELF_STATUS_PATH: &str = "/proc/self/status";

/// Resident set size of this process, bounded by physical memory.
#[derive(Debug, Clone)]
pub struct ProcessOracle {
    status_path: PathBuf,
    meminfo_path: PathBuf,
}

impl ProcessOracle {
    pub fn new() -> Self {
        Self::with_paths(SELF_STATUS_PATH, MEMINFO_PATH)
    }

    /// Reads from alternative `status` / `meminfo` files.
    pub fn with_paths(status: impl Into<PathBuf>, meminfo: impl Into<PathBuf>) -> Self {
        Self {
            status_path: status.into(),
            meminfo_path: meminfo.into(),
        }
    }
}

impl Default for ProcessOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOracle for ProcessOracle {
    fn name(&self) -> &str {
        "process"
    }

    fn current_usage(&self) -> Result<u64, OracleError> {
        let content = read_value_file(&self.status_path)?;
        Ok(find_kb_field(&content, "VmRSS:", &self.status_path)? * 1024)
    }

    fn limit(&self) -> Result<u64, OracleError> {
        Ok(MemoryInfo::read_from(&self.meminfo_path)?.total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const SAMPLE_STATUS: &str = "\
Name:   linecount
VmPeak:    20480 kB
VmSize:    20000 kB
VmHWM:      9000 kB
VmRSS:      8192 kB
Threads:        1
";

    #[test]
    fn test_readings_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let status = dir.path().join("status");
        let meminfo = dir.path().join("meminfo");
        std::fs::write(&status, SAMPLE_STATUS).unwrap();
        std::fs::write(&meminfo, "MemTotal: 1024 kB\nMemAvailable: 512 kB\n").unwrap();

        let oracle = ProcessOracle::with_paths(&status, &meminfo);
        assert_eq!(oracle.current_usage().unwrap(), 8192 * 1024);
        assert_eq!(oracle.working_set().unwrap(), 8192 * 1024);
        assert_eq!(oracle.limit().unwrap(), 1024 * 1024);
    }

    #[test]
    fn test_missing_status() {
        let oracle = ProcessOracle::with_paths("/nonexistent/status", "/nonexistent/meminfo");
        assert!(matches!(
            oracle.current_usage(),
            Err(OracleError::NotAvailable { .. })
        ));
    }

    #[test]
    fn test_real_process() {
        if Path::new(SELF_STATUS_PATH).exists() {
            let oracle = ProcessOracle::new();
            assert!(oracle.current_usage().unwrap() > 0);
        }
    }
}
