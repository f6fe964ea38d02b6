// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Resident partial counts.

use crate::CountError;
use memory_budget::FootprintTracker;
use std::collections::BTreeMap;

/// Sorted map of key to count, plus a running estimate of its footprint.
///
/// Every present key has a count of at least 1. The map is only ever
/// emptied as a whole, through [`take`](Self::take).
#[derive(Debug, Default)]
pub struct Accumulator {
    counts: BTreeMap<Vec<u8>, u64>,
    footprint: FootprintTracker,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count for `key`, inserting it with count 1 if absent.
    ///
    /// The key is only copied when it is new. Fails with
    /// [`CountError::CountOverflow`] rather than wrapping at `u64::MAX`.
    pub fn ingest(&mut self, key: &[u8]) -> Result<(), CountError> {
        if let Some(count) = self.counts.get_mut(key) {
            *count = count
                .checked_add(1)
                .ok_or_else(|| CountError::CountOverflow {
                    key: String::from_utf8_lossy(key).into_owned(),
                })?;
            return Ok(());
        }
        self.counts.insert(key.to_vec(), 1);
        self.footprint.record_insert(key.len());
        Ok(())
    }

    /// Removes and returns every resident pair, leaving the accumulator
    /// empty with a zeroed footprint.
    pub fn take(&mut self) -> BTreeMap<Vec<u8>, u64> {
        self.footprint.reset();
        std::mem::take(&mut self.counts)
    }

    pub fn get(&self, key: &[u8]) -> Option<u64> {
        self.counts.get(key).copied()
    }

    /// Number of distinct resident keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn footprint(&self) -> &FootprintTracker {
        &self.footprint
    }

    /// Consumes the accumulator, yielding its map.
    pub fn into_map(self) -> BTreeMap<Vec<u8>, u64> {
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_counts_and_orders() {
        let mut acc = Accumulator::new();
        for key in ["b", "a", "b", "c", "b"] {
            acc.ingest(key.as_bytes()).unwrap();
        }
        assert_eq!(acc.len(), 3);
        assert_eq!(acc.get(b"b"), Some(3));
        let keys: Vec<_> = acc.into_map().into_keys().collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_footprint_tracks_distinct_keys() {
        let mut acc = Accumulator::new();
        acc.ingest(b"hello").unwrap();
        acc.ingest(b"hello").unwrap();
        acc.ingest(b"hi").unwrap();
        assert_eq!(acc.footprint().entries(), 2);
        assert_eq!(acc.footprint().content_bytes(), 7);
    }

    #[test]
    fn test_take_resets() {
        let mut acc = Accumulator::new();
        acc.ingest(b"x").unwrap();
        let taken = acc.take();
        assert_eq!(taken.get(b"x".as_slice()), Some(&1));
        assert!(acc.is_empty());
        assert_eq!(acc.footprint().entries(), 0);
        assert_eq!(acc.footprint().content_bytes(), 0);
    }

    #[test]
    fn test_empty_key() {
        let mut acc = Accumulator::new();
        acc.ingest(b"").unwrap();
        acc.ingest(b"").unwrap();
        assert_eq!(acc.get(b""), Some(2));
    }

    #[test]
    fn test_count_overflow() {
        let mut acc = Accumulator::new();
        acc.counts.insert(b"k".to_vec(), u64::MAX - 1);
        acc.ingest(b"k").unwrap();
        assert_eq!(acc.get(b"k"), Some(u64::MAX));
        assert!(matches!(
            acc.ingest(b"k"),
            Err(CountError::CountOverflow { ref key }) if key == "k"
        ));
        assert_eq!(acc.get(b"k"), Some(u64::MAX));
    }
}
