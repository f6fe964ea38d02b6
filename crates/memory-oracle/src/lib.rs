// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-oracle
//!
//! Reads the memory usage and ceiling of the current process from the
//! kernel's resource-accounting files, so a memory-bounded consumer can
//! compare what it actually uses against what it is allowed to use.
//!
//! # Sources
//! - **cgroup v2**: `memory.current`, `memory.max`, `memory.stat`.
//! - **cgroup v1**: `memory.usage_in_bytes`, `memory.limit_in_bytes`,
//!   `memory.stat`.
//! - **process**: `VmRSS` from `/proc/self/status`, bounded by `MemTotal`
//!   from `/proc/meminfo`. Used when no memory cgroup is mounted.
//!
//! Every source implements [`MemoryOracle`]. Consumers receive a
//! `Box<dyn MemoryOracle>` and never touch the filesystem themselves, which
//! makes [`ScriptedOracle`] a drop-in replacement in tests.
//!
//! # Example
//! ```no_run
//! use memory_oracle::{detect, MemorySnapshot};
//!
//! let oracle = detect().expect("no memory accounting available");
//! let snap = MemorySnapshot::capture(oracle.as_ref()).unwrap();
//! println!("{}", snap.summary());
//! ```

mod cgroup;
mod error;
mod meminfo;
mod oracle;
mod process;
mod scripted;
mod snapshot;

pub use cgroup::{parse_memory_stat, CgroupV1Oracle, CgroupV2Oracle};
pub use error::OracleError;
pub use meminfo::MemoryInfo;
pub use oracle::{detect, MemoryOracle, UNLIMITED};
pub use process::ProcessOracle;
pub use scripted::ScriptedOracle;
pub use snapshot::MemorySnapshot;
