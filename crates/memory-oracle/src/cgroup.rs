// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory cgroup accounting (v1 and v2).
//!
//! Inside a container the cgroup, not the host, decides when the process is
//! killed for running out of memory, so these are the readings that matter.
//!
//! | | v1 | v2 |
//! |---|---|---|
//! | usage | `memory.usage_in_bytes` | `memory.current` |
//! | limit | `memory.limit_in_bytes` | `memory.max` (`max` = unlimited) |
//! | cache | `total_inactive_file` in `memory.stat` | `inactive_file` in `memory.stat` |
//!
//! The working set is usage minus inactive file cache, the same signal
//! container runtimes use for eviction.

use crate::{MemoryOracle, OracleError, UNLIMITED};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Mount point of the unified (v2) hierarchy.
const CGROUP2_ROOT: &str = "/sys/fs/cgroup";

/// Mount point of the v1 memory controller.
const CGROUP1_MEMORY_ROOT: &str = "/sys/fs/cgroup/memory";

/// Membership file of the current process.
const SELF_CGROUP: &str = "/proc/self/cgroup";

/// Reads a cgroupfs/procfs file and returns its trimmed content.
pub(crate) fn read_value_file(path: &Path) -> Result<String, OracleError> {
    if !path.exists() {
        return Err(OracleError::NotAvailable {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| OracleError::ReadError {
            path: path.display().to_string(),
            source: e,
        })
}

fn read_u64(path: &Path) -> Result<u64, OracleError> {
    let content = read_value_file(path)?;
    content.parse::<u64>().map_err(|_| OracleError::ParseError {
        path: path.display().to_string(),
        detail: format!("expected integer byte count, got '{content}'"),
    })
}

/// Parses a `memory.stat` file: one `name value` pair per line.
///
/// Lines that do not have exactly two fields are skipped; a second field
/// that is not an integer is an error.
pub fn parse_memory_stat(content: &str, source_path: &Path) -> Result<BTreeMap<String, u64>, OracleError> {
    let mut stats = BTreeMap::new();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let value = value.parse::<u64>().map_err(|_| OracleError::ParseError {
            path: source_path.display().to_string(),
            detail: format!("expected integer for '{name}', got '{value}'"),
        })?;
        stats.insert(name.to_string(), value);
    }
    Ok(stats)
}

fn read_memory_stat(path: &Path) -> Result<BTreeMap<String, u64>, OracleError> {
    let content = read_value_file(path)?;
    parse_memory_stat(&content, path)
}

// ── cgroup v2 ──────────────────────────────────────────────────

/// Reads a cgroup v2 memory controller directory.
#[derive(Debug, Clone)]
pub struct CgroupV2Oracle {
    dir: PathBuf,
}

impl CgroupV2Oracle {
    /// Uses the given cgroup directory (must contain `memory.current`).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Locates the current process's v2 cgroup, if one is mounted.
    ///
    /// Resolves the `0::<path>` entry of `/proc/self/cgroup` under the v2
    /// mount; containers usually see `/`, which is the mount itself.
    pub fn detect() -> Option<Self> {
        let root = Path::new(CGROUP2_ROOT);
        let own = std::fs::read_to_string(SELF_CGROUP).ok().and_then(|content| {
            content
                .lines()
                .find_map(|l| l.strip_prefix("0::"))
                .map(|rel| root.join(rel.trim_start_matches('/')))
        });

        own.into_iter()
            .chain(std::iter::once(root.to_path_buf()))
            .find(|dir| dir.join("memory.current").exists())
            .map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MemoryOracle for CgroupV2Oracle {
    fn name(&self) -> &str {
        "cgroup-v2"
    }

    fn current_usage(&self) -> Result<u64, OracleError> {
        read_u64(&self.dir.join("memory.current"))
    }

    fn limit(&self) -> Result<u64, OracleError> {
        let path = self.dir.join("memory.max");
        let content = read_value_file(&path)?;
        if content == "max" {
            return Ok(UNLIMITED);
        }
        content.parse::<u64>().map_err(|_| OracleError::ParseError {
            path: path.display().to_string(),
            detail: format!("expected integer or 'max', got '{content}'"),
        })
    }

    fn working_set(&self) -> Result<u64, OracleError> {
        let usage = self.current_usage()?;
        let stats = self.memory_stat()?;
        let inactive = stats.get("inactive_file").copied().unwrap_or(0);
        Ok(usage.saturating_sub(inactive))
    }

    fn memory_stat(&self) -> Result<BTreeMap<String, u64>, OracleError> {
        read_memory_stat(&self.dir.join("memory.stat"))
    }
}

// ── cgroup v1 ──────────────────────────────────────────────────

/// Reads a cgroup v1 memory controller directory.
#[derive(Debug, Clone)]
pub struct CgroupV1Oracle {
    dir: PathBuf,
}

impl CgroupV1Oracle {
    /// Uses the given controller directory (must contain `memory.usage_in_bytes`).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the v1 memory controller mount, if present.
    pub fn detect() -> Option<Self> {
        let dir = Path::new(CGROUP1_MEMORY_ROOT);
        dir.join("memory.usage_in_bytes")
            .exists()
            .then(|| Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MemoryOracle for CgroupV1Oracle {
    fn name(&self) -> &str {
        "cgroup-v1"
    }

    fn current_usage(&self) -> Result<u64, OracleError> {
        read_u64(&self.dir.join("memory.usage_in_bytes"))
    }

    fn limit(&self) -> Result<u64, OracleError> {
        read_u64(&self.dir.join("memory.limit_in_bytes"))
    }

    fn working_set(&self) -> Result<u64, OracleError> {
        let usage = self.current_usage()?;
        let stats = self.memory_stat()?;
        let inactive = stats
            .get("total_inactive_file")
            .or_else(|| stats.get("inactive_file"))
            .copied()
            .unwrap_or(0);
        Ok(usage.saturating_sub(inactive))
    }

    fn memory_stat(&self) -> Result<BTreeMap<String, u64>, OracleError> {
        read_memory_stat(&self.dir.join("memory.stat"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    const SAMPLE_STAT_V2: &str = "\
anon 8388608
file 4194304
active_file 1048576
inactive_file 3145728
pgfault 1200
";

    const SAMPLE_STAT_V1: &str = "\
cache 4194304
rss 8388608
inactive_file 1048576
total_inactive_file 2097152
";

    #[test]
    fn test_parse_memory_stat() {
        let stats = parse_memory_stat(SAMPLE_STAT_V2, Path::new("memory.stat")).unwrap();
        assert_eq!(stats.len(), 5);
        assert_eq!(stats["anon"], 8388608);
        assert_eq!(stats["inactive_file"], 3145728);
    }

    #[test]
    fn test_parse_memory_stat_skips_odd_lines() {
        let stats = parse_memory_stat("anon 1\n\nweird line here\nfile 2\n", Path::new("x")).unwrap();
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn test_parse_memory_stat_rejects_non_numeric() {
        let result = parse_memory_stat("anon lots\n", Path::new("memory.stat"));
        assert!(matches!(result, Err(OracleError::ParseError { .. })));
    }

    #[test]
    fn test_v2_readings() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "memory.current", "12582912\n");
        write(dir.path(), "memory.max", "67108864\n");
        write(dir.path(), "memory.stat", SAMPLE_STAT_V2);

        let oracle = CgroupV2Oracle::new(dir.path());
        assert_eq!(oracle.current_usage().unwrap(), 12582912);
        assert_eq!(oracle.limit().unwrap(), 67108864);
        assert_eq!(oracle.working_set().unwrap(), 12582912 - 3145728);
    }

    #[test]
    fn test_v2_unlimited() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "memory.max", "max\n");
        assert_eq!(CgroupV2Oracle::new(dir.path()).limit().unwrap(), UNLIMITED);
    }

    #[test]
    fn test_v2_bad_limit() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "memory.max", "lots\n");
        let result = CgroupV2Oracle::new(dir.path()).limit();
        assert!(matches!(result, Err(OracleError::ParseError { .. })));
    }

    #[test]
    fn test_v1_readings() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "memory.usage_in_bytes", "10485760");
        write(dir.path(), "memory.limit_in_bytes", "20971520");
        write(dir.path(), "memory.stat", SAMPLE_STAT_V1);

        let oracle = CgroupV1Oracle::new(dir.path());
        assert_eq!(oracle.name(), "cgroup-v1");
        assert_eq!(oracle.current_usage().unwrap(), 10485760);
        assert_eq!(oracle.limit().unwrap(), 20971520);
        // Hierarchical total wins over the local counter.
        assert_eq!(oracle.working_set().unwrap(), 10485760 - 2097152);
    }

    #[test]
    fn test_working_set_never_negative() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "memory.current", "100");
        write(dir.path(), "memory.stat", "inactive_file 500\n");
        assert_eq!(CgroupV2Oracle::new(dir.path()).working_set().unwrap(), 0);
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = CgroupV1Oracle::new(dir.path()).current_usage();
        assert!(matches!(result, Err(OracleError::NotAvailable { .. })));
    }
}
