// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Streaming k-way merge of sorted sources.
//!
//! Each source yields pairs with strictly ascending keys. The merger keeps
//! one buffered head per source in a min-heap ordered on
//! `(key, source index)`, pops the smallest key, drains every other head
//! with the same key and emits one pair with the summed count.
//!
//! Memory is proportional to the number of sources, never to the number
//! of distinct keys.

use crate::{CountError, Entry, EntryResult};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A sorted stream of pairs feeding the merge.
pub type Source = Box<dyn Iterator<Item = EntryResult> + Send>;

#[derive(Debug, PartialEq, Eq)]
struct HeapItem {
    key: Vec<u8>,
    count: u64,
    source: usize,
}

impl Ord for HeapItem {
    // Reversed so the max-heap pops the smallest key first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.source.cmp(&self.source))
    }
}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Merges sorted sources into one sorted sequence, summing equal keys.
///
/// Yields at most one error, after which it is exhausted.
pub struct RunMerger {
    sources: Vec<Source>,
    heap: BinaryHeap<HeapItem>,
    done: bool,
}

impl RunMerger {
    /// Buffers the first pair of every source.
    pub fn new(sources: Vec<Source>) -> Result<Self, CountError> {
        let mut merger = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
            done: false,
        };
        for index in 0..merger.sources.len() {
            merger.advance(index)?;
        }
        Ok(merger)
    }

    /// Number of sources being merged.
    pub fn fan_in(&self) -> usize {
        self.sources.len()
    }

    fn advance(&mut self, source: usize) -> Result<(), CountError> {
        if let Some(next) = self.sources[source].next() {
            let (key, count) = next?;
            self.heap.push(HeapItem { key, count, source });
        }
        Ok(())
    }

    fn next_entry(&mut self) -> Result<Option<Entry>, CountError> {
        let Some(head) = self.heap.pop() else {
            return Ok(None);
        };
        let HeapItem {
            key,
            mut count,
            source,
        } = head;
        self.advance(source)?;

        while self.heap.peek().is_some_and(|item| item.key == key) {
            let Some(item) = self.heap.pop() else { break };
            count = count
                .checked_add(item.count)
                .ok_or_else(|| CountError::CountOverflow {
                    key: String::from_utf8_lossy(&key).into_owned(),
                })?;
            self.advance(item.source)?;
        }

        Ok(Some((key, count)))
    }
}

impl Iterator for RunMerger {
    type Item = EntryResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                self.heap.clear();
                Some(Err(e))
            }
        }
    }
}

impl std::fmt::Debug for RunMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunMerger")
            .field("sources", &self.sources.len())
            .field("buffered", &self.heap.len())
            .field("done", &self.done)
            .finish()
    }
}
