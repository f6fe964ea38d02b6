// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host memory totals via `/proc/meminfo`.
//!
//! Outside a memory cgroup, physical memory is the only bound, so this is
//! where [`ProcessOracle`](crate::ProcessOracle) takes its limit from.

use crate::cgroup::read_value_file;
use crate::OracleError;
use std::path::Path;

pub(crate) const MEMINFO_PATH: &str = "/proc/meminfo";

/// Physical memory of the host, in bytes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    /// What the kernel estimates can be allocated without swapping.
    pub available_bytes: u64,
    /// `total - available`.
    pub used_bytes: u64,
}

impl MemoryInfo {
    pub fn read() -> Result<Self, OracleError> {
        Self::read_from(Path::new(MEMINFO_PATH))
    }

    /// Reads a meminfo-formatted file other than `/proc/meminfo`.
    pub fn read_from(path: &Path) -> Result<Self, OracleError> {
        let content = read_value_file(path)?;
        Self::parse(&content, path)
    }

    pub(crate) fn parse(content: &str, source_path: &Path) -> Result<Self, OracleError> {
        let total_bytes = find_kb_field(content, "MemTotal:", source_path)?.saturating_mul(1024);
        let available_bytes =
            find_kb_field(content, "MemAvailable:", source_path)?.saturating_mul(1024);
        Ok(Self {
            total_bytes,
            available_bytes,
            used_bytes: total_bytes.saturating_sub(available_bytes),
        })
    }

    /// Used share of physical memory, `0.0` when the total is unknown.
    pub fn utilisation(&self) -> f64 {
        match self.total_bytes {
            0 => 0.0,
            total => self.used_bytes as f64 / total as f64,
        }
    }
}

/// Value of a `Name:   1234 kB` line, in kB.
///
/// `/proc/meminfo` and `/proc/self/status` share this layout.
pub(crate) fn find_kb_field(content: &str, field: &str, source_path: &Path) -> Result<u64, OracleError> {
    let parse_error = |detail: String| OracleError::ParseError {
        path: source_path.display().to_string(),
        detail,
    };

    let value = content
        .lines()
        .find_map(|line| {
            let mut parts = line.split_whitespace();
            (parts.next() == Some(field)).then(|| parts.next()).flatten()
        })
        .ok_or_else(|| parse_error(format!("{} not found", field.trim_end_matches(':'))))?;

    value
        .parse::<u64>()
        .map_err(|_| parse_error(format!("expected integer kB value for {field}, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    // A 2 GiB container host, abridged.
    const HOST: &str = "\
MemTotal:        2097152 kB
MemFree:          131072 kB
MemAvailable:     524288 kB
Cached:           393216 kB
SwapTotal:             0 kB
";

    #[test]
    fn test_parse() {
        let info = MemoryInfo::parse(HOST, Path::new("meminfo")).unwrap();
        assert_eq!(info.total_bytes, 2 << 30);
        assert_eq!(info.available_bytes, 512 << 20);
        assert_eq!(info.used_bytes, (2 << 30) - (512 << 20));
        assert!((info.utilisation() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_field_must_match_exactly() {
        // `MemAvailableX:` is not `MemAvailable:`.
        let content = "MemTotal: 100 kB\nMemAvailableX: 50 kB\n";
        let err = MemoryInfo::parse(content, Path::new("meminfo")).unwrap_err();
        match err {
            OracleError::ParseError { detail, .. } => assert!(detail.contains("MemAvailable")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_field() {
        let result = find_kb_field("VmRSS:  many kB\n", "VmRSS:", Path::new("status"));
        assert!(matches!(result, Err(OracleError::ParseError { .. })));
    }

    #[test]
    fn test_unknown_total() {
        let info = MemoryInfo {
            total_bytes: 0,
            available_bytes: 0,
            used_bytes: 0,
        };
        assert_eq!(info.utilisation(), 0.0);
    }

    #[test]
    fn test_read_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meminfo");
        std::fs::write(&path, HOST).unwrap();
        assert_eq!(MemoryInfo::read_from(&path).unwrap().total_bytes, 2 << 30);
        assert!(matches!(
            MemoryInfo::read_from(&dir.path().join("absent")),
            Err(OracleError::NotAvailable { .. })
        ));
    }

    #[test]
    fn test_host_meminfo_is_consistent() {
        if let Ok(info) = MemoryInfo::read() {
            assert!(info.total_bytes > 0);
            assert!(info.used_bytes <= info.total_bytes);
        }
    }
}
