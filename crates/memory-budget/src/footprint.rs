// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Running footprint estimate for an in-memory key → count aggregate.
//!
//! The estimate is maintained incrementally rather than measured:
//!
//! ```text
//! estimate = MAP_OVERHEAD + entries × ENTRY_OVERHEAD   (container)
//!          + 2 × Σ key_len                             (content)
//! ```
//!
//! The content term is doubled to approximate the transient peak while the
//! container grows, which is where an out-of-memory kill would land.

use crate::MemoryBudget;

/// Fixed cost of an empty ordered map.
pub const MAP_OVERHEAD_BYTES: u64 = 48;

/// Per-entry cost excluding key bytes: the key's `Vec` header, the `u64`
/// count and amortised tree-node slack.
pub const ENTRY_OVERHEAD_BYTES: u64 = 48;

/// Incremental footprint estimate of a resident aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct FootprintTracker {
    entries: u64,
    content_bytes: u64,
}

impl FootprintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for a newly inserted distinct key.
    pub fn record_insert(&mut self, key_len: usize) {
        self.entries += 1;
        self.content_bytes = self.content_bytes.saturating_add(key_len as u64);
    }

    /// Forgets everything; called when the aggregate is cleared.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Number of distinct keys accounted for.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of distinct key lengths.
    pub fn content_bytes(&self) -> u64 {
        self.content_bytes
    }

    /// Estimated container overhead.
    pub fn container_bytes(&self) -> u64 {
        MAP_OVERHEAD_BYTES.saturating_add(self.entries.saturating_mul(ENTRY_OVERHEAD_BYTES))
    }

    /// Estimated peak footprint in bytes.
    pub fn estimated_bytes(&self) -> u64 {
        self.container_bytes()
            .saturating_add(self.content_bytes.saturating_mul(2))
    }

    /// Returns `true` if the estimate is strictly above `budget`.
    pub fn exceeds(&self, budget: MemoryBudget) -> bool {
        self.estimated_bytes() > budget.as_bytes()
    }
}
