// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`MemoryOracle`] trait and source auto-detection.

use crate::{CgroupV1Oracle, CgroupV2Oracle, OracleError, ProcessOracle};
use std::collections::BTreeMap;

/// Limit reported when the source imposes no ceiling.
pub const UNLIMITED: u64 = u64::MAX;

/// A read-only view of the current memory usage and ceiling.
///
/// Implementations must be side-effect free: reading twice in a row with
/// no allocation in between returns (roughly) the same numbers.
pub trait MemoryOracle: Send {
    /// Short identifier of the source, e.g. `"cgroup-v2"`.
    fn name(&self) -> &str;

    /// Memory currently charged to the process or its cgroup, in bytes.
    fn current_usage(&self) -> Result<u64, OracleError>;

    /// The configured ceiling in bytes; [`UNLIMITED`] when there is none.
    fn limit(&self) -> Result<u64, OracleError>;

    /// Usage minus easily reclaimable page cache, in bytes.
    ///
    /// Sources without a cache breakdown report raw usage.
    fn working_set(&self) -> Result<u64, OracleError> {
        self.current_usage()
    }

    /// Raw `name value` counters backing the readings, if the source has any.
    fn memory_stat(&self) -> Result<BTreeMap<String, u64>, OracleError> {
        Ok(BTreeMap::new())
    }
}

impl<O: MemoryOracle + ?Sized> MemoryOracle for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn current_usage(&self) -> Result<u64, OracleError> {
        (**self).current_usage()
    }

    fn limit(&self) -> Result<u64, OracleError> {
        (**self).limit()
    }

    fn working_set(&self) -> Result<u64, OracleError> {
        (**self).working_set()
    }

    fn memory_stat(&self) -> Result<BTreeMap<String, u64>, OracleError> {
        (**self).memory_stat()
    }
}

/// Picks the most precise source available on this host.
///
/// Tries cgroup v2, then cgroup v1, then per-process accounting. A source
/// is accepted only if both its usage and its limit can be read, so a
/// returned oracle is known to work. Fails with the process source's error
/// when nothing is readable.
pub fn detect() -> Result<Box<dyn MemoryOracle>, OracleError> {
    if let Some(oracle) = CgroupV2Oracle::detect() {
        if probe(&oracle) {
            return Ok(Box::new(oracle));
        }
    }
    if let Some(oracle) = CgroupV1Oracle::detect() {
        if probe(&oracle) {
            return Ok(Box::new(oracle));
        }
    }

    let oracle = ProcessOracle::new();
    oracle.current_usage()?;
    oracle.limit()?;
    tracing::debug!("memory oracle: using per-process accounting");
    Ok(Box::new(oracle))
}

fn probe(oracle: &dyn MemoryOracle) -> bool {
    match (oracle.current_usage(), oracle.limit()) {
        (Ok(_), Ok(_)) => {
            tracing::debug!("memory oracle: using {}", oracle.name());
            true
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!("memory oracle: {} unusable: {e}", oracle.name());
            false
        }
    }
}
