// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The final, lazily produced counts.

use crate::merge::RunMerger;
use crate::spill::RunSet;
use crate::{CountError, Entry, EntryResult};
use std::cmp::Reverse;
use std::collections::{btree_map, BinaryHeap};

enum Backing {
    Resident(btree_map::IntoIter<Vec<u8>, u64>),
    Merged(RunMerger),
}

/// Final `(key, count)` pairs in ascending key order.
///
/// Without spills the pairs come straight from the resident map. After
/// spills they are produced by merging every run with the resident
/// leftovers, so the full result is never held in memory.
///
/// The view owns the run files; they are removed when it is dropped
/// (unless the counter was configured to keep them).
pub struct Counts {
    // Readers close before the run files are removed.
    backing: Backing,
    runs: RunSet,
}

impl Counts {
    pub(crate) fn resident(map: std::collections::BTreeMap<Vec<u8>, u64>) -> Self {
        Self {
            backing: Backing::Resident(map.into_iter()),
            runs: RunSet::default(),
        }
    }

    pub(crate) fn merged(merger: RunMerger, runs: RunSet) -> Self {
        Self {
            backing: Backing::Merged(merger),
            runs,
        }
    }

    /// Whether spills occurred and the pairs come from a merge.
    pub fn spilled(&self) -> bool {
        matches!(self.backing, Backing::Merged(_))
    }

    /// The runs being merged, empty without spills.
    pub fn runs(&self) -> &RunSet {
        &self.runs
    }

    /// Collects every pair. Only for results known to fit in memory.
    pub fn collect_counts(self) -> Result<Vec<Entry>, CountError> {
        self.collect()
    }

    /// Consumes the view and returns the `n` most frequent pairs.
    ///
    /// Ordered by count descending, then key ascending. Holds at most
    /// `n + 1` pairs at a time.
    pub fn most_common(self, n: usize) -> Result<Vec<Entry>, CountError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        // Min-heap on (count, reversed key): the top is the weakest pair.
        let mut heap: BinaryHeap<Reverse<(u64, Reverse<Vec<u8>>)>> =
            BinaryHeap::with_capacity(n + 1);
        for pair in self {
            let (key, count) = pair?;
            heap.push(Reverse((count, Reverse(key))));
            if heap.len() > n {
                heap.pop();
            }
        }

        // Ascending `Reverse` order is strongest first.
        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse((count, Reverse(key)))| (key, count))
            .collect())
    }
}

impl Iterator for Counts {
    type Item = EntryResult;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.backing {
            Backing::Resident(iter) => iter.next().map(Ok),
            Backing::Merged(merger) => merger.next(),
        }
    }
}

impl std::fmt::Debug for Counts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counts")
            .field("spilled", &self.spilled())
            .field("runs", &self.runs.runs().len())
            .finish()
    }
}
