// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Spilling resident state to run files, and the run registry.
//!
//! The [`SpillManager`] owns the spill directory and every registered
//! [`RunHandle`]. A run is registered only after its file has been fully
//! written, synced and renamed, so the registry never refers to a partial
//! file.

use crate::merge::{RunMerger, Source};
use crate::run::{RunHandle, RunWriter};
use crate::{CountError, EntryResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes run files and keeps track of them until the merge.
#[derive(Debug)]
pub struct SpillManager {
    // Declared before `owned_dir` so handles drop before the directory.
    runs: Vec<RunHandle>,
    dir: PathBuf,
    owned_dir: Option<TempDir>,
    keep_runs: bool,
    next_id: u64,
}

impl SpillManager {
    /// Uses `dir` (created if missing) or, when `None`, a fresh private
    /// temporary directory.
    ///
    /// With `keep_runs` a private directory is not removed on drop either;
    /// its path is logged so the runs can be found.
    pub fn new(dir: Option<&Path>, keep_runs: bool) -> Result<Self, CountError> {
        let (dir, owned_dir) = match dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|source| CountError::SpillFailure {
                    path: dir.to_path_buf(),
                    source,
                })?;
                (dir.to_path_buf(), None)
            }
            None => {
                let tmp = tempfile::Builder::new()
                    .prefix("linecount-")
                    .tempdir()
                    .map_err(|source| CountError::SpillFailure {
                        path: std::env::temp_dir(),
                        source,
                    })?;
                if keep_runs {
                    let path = tmp.keep();
                    tracing::info!("run files kept in {}", path.display());
                    (path, None)
                } else {
                    (tmp.path().to_path_buf(), Some(tmp))
                }
            }
        };
        tracing::debug!("spill directory: {}", dir.display());

        Ok(Self {
            runs: Vec::new(),
            dir,
            owned_dir,
            keep_runs,
            next_id: 1,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Registered runs in creation order.
    pub fn runs(&self) -> &[RunHandle] {
        &self.runs
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Writes `pairs` as a new run and registers it.
    ///
    /// An empty map is skipped and returns `None`.
    pub fn spill(
        &mut self,
        pairs: BTreeMap<Vec<u8>, u64>,
    ) -> Result<Option<&RunHandle>, CountError> {
        if pairs.is_empty() {
            tracing::debug!("nothing resident; spill skipped");
            return Ok(None);
        }
        let handle = self.write_run(pairs.into_iter().map(Ok::<_, CountError>))?;
        self.runs.push(handle);
        Ok(self.runs.last())
    }

    /// Writes a sorted stream to a new run file without registering it.
    pub fn write_run<I>(&mut self, pairs: I) -> Result<RunHandle, CountError>
    where
        I: IntoIterator<Item = EntryResult>,
    {
        let id = self.next_id;
        self.next_id += 1;

        let mut writer = RunWriter::create(&self.dir, id)?;
        for pair in pairs {
            let (key, count) = pair?;
            writer.write(&key, count)?;
        }
        writer.finish(self.keep_runs)
    }

    /// Merges runs until `runs + reserved <= fan_in`.
    ///
    /// `reserved` counts sources the final merge needs besides the runs
    /// (the resident map). Each pass merges the oldest runs into one new
    /// run at the end of the registry. Returns the number of passes.
    pub fn compact(&mut self, fan_in: usize, reserved: usize) -> Result<usize, CountError> {
        let fan_in = fan_in.max(2);
        let mut passes = 0;

        while self.runs.len() + reserved > fan_in && self.runs.len() >= 2 {
            let excess = self.runs.len() + reserved - fan_in;
            let chunk = (excess + 1).min(fan_in).min(self.runs.len());
            let inputs: Vec<RunHandle> = self.runs.drain(..chunk).collect();

            let sources = open_sources(&inputs)?;
            let merger = RunMerger::new(sources)?;
            let merged = self.write_run(merger)?;
            tracing::info!(
                "compacted {} runs into run {} ({} entries)",
                inputs.len(),
                merged.id(),
                merged.entries(),
            );
            // Kept directories hold only live runs; their contents sum to the result.
            inputs.into_iter().for_each(RunHandle::discard);
            self.runs.push(merged);
            passes += 1;
        }
        Ok(passes)
    }

    /// Hands the registry and directory over to the result view.
    pub fn into_run_set(self) -> RunSet {
        RunSet {
            runs: self.runs,
            _dir: self.owned_dir,
        }
    }
}

/// Opens one reader per run.
pub(crate) fn open_sources(runs: &[RunHandle]) -> Result<Vec<Source>, CountError> {
    runs.iter()
        .map(|run| Ok(Box::new(run.open()?) as Source))
        .collect()
}

/// Registered runs plus the directory holding them, kept alive together.
#[derive(Debug, Default)]
pub struct RunSet {
    runs: Vec<RunHandle>,
    _dir: Option<TempDir>,
}

impl RunSet {
    pub fn runs(&self) -> &[RunHandle] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub(crate) fn sources(&self) -> Result<Vec<Source>, CountError> {
        open_sources(&self.runs)
    }
}

/// Asks the allocator to return freed pages to the OS.
///
/// Only glibc exposes this; elsewhere it does nothing.
pub fn release_memory() {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    {
        // SAFETY: malloc_trim has no preconditions and only touches
        // allocator-internal state.
        unsafe {
            libc::malloc_trim(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, u64)]) -> BTreeMap<Vec<u8>, u64> {
        pairs.iter().map(|(k, c)| (k.as_bytes().to_vec(), *c)).collect()
    }

    fn read_run(run: &RunHandle) -> Vec<(Vec<u8>, u64)> {
        run.open().unwrap().map(Result::unwrap).collect()
    }

    #[test]
    fn test_spill_registers_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = SpillManager::new(Some(dir.path()), false).unwrap();
        let run = mgr.spill(map(&[("b", 1), ("a", 2)])).unwrap().unwrap();
        assert_eq!(run.id(), 1);
        assert_eq!(run.entries(), 2);
        assert_eq!(read_run(&mgr.runs()[0]), vec![(b"a".to_vec(), 2), (b"b".to_vec(), 1)]);
    }

    #[test]
    fn test_empty_spill_skipped() {
        let mut mgr = SpillManager::new(None, false).unwrap();
        assert!(mgr.spill(BTreeMap::new()).unwrap().is_none());
        assert_eq!(mgr.run_count(), 0);
    }

    #[test]
    fn test_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let mgr = SpillManager::new(Some(&nested), false).unwrap();
        assert!(nested.is_dir());
        assert_eq!(mgr.dir(), nested);
    }

    #[test]
    fn test_private_dir_removed_with_run_set() {
        let mut mgr = SpillManager::new(None, false).unwrap();
        mgr.spill(map(&[("a", 1)])).unwrap();
        let dir = mgr.dir().to_path_buf();
        let set = mgr.into_run_set();
        assert_eq!(set.runs().len(), 1);
        drop(set);
        assert!(!dir.exists());
    }

    #[test]
    fn test_keep_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = SpillManager::new(Some(dir.path()), true).unwrap();
        mgr.spill(map(&[("a", 1)])).unwrap();
        let path = mgr.runs()[0].path().to_path_buf();
        drop(mgr);
        assert!(path.exists());
    }

    #[test]
    fn test_private_dir_kept_with_keep_runs() {
        let mut mgr = SpillManager::new(None, true).unwrap();
        mgr.spill(map(&[("a", 1)])).unwrap();
        let dir = mgr.dir().to_path_buf();
        drop(mgr.into_run_set());
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_compact() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = SpillManager::new(Some(dir.path()), false).unwrap();
        for i in 0..5u64 {
            mgr.spill(map(&[("a", 1), (format!("k{i}").as_str(), i + 1)])).unwrap();
        }
        let passes = mgr.compact(3, 1).unwrap();
        assert!(passes >= 1);
        assert!(mgr.run_count() + 1 <= 3);

        let set = mgr.into_run_set();
        let merged: Vec<_> = RunMerger::new(set.sources().unwrap())
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(merged[0], (b"a".to_vec(), 5));
        assert_eq!(merged.len(), 6);
        assert_eq!(merged[5], (b"k4".to_vec(), 5));
        // Compacted inputs were removed.
        drop(set);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_compact_with_keep_runs_removes_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = SpillManager::new(Some(dir.path()), true).unwrap();
        for key in ["a", "b", "a", "c"] {
            mgr.spill(map(&[(key, 1)])).unwrap();
        }
        assert_eq!(mgr.compact(2, 1).unwrap(), 3);
        assert_eq!(mgr.run_count(), 1);

        let kept = mgr.runs()[0].path().to_path_buf();
        drop(mgr);
        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files, vec![kept.clone()]);
        let contents = std::fs::read_to_string(&kept).unwrap();
        assert_eq!(contents, "a\t2\nb\t1\nc\t1\n");
    }

    #[test]
    fn test_compact_noop_within_fan_in() {
        let mut mgr = SpillManager::new(None, false).unwrap();
        mgr.spill(map(&[("a", 1)])).unwrap();
        mgr.spill(map(&[("b", 1)])).unwrap();
        assert_eq!(mgr.compact(64, 1).unwrap(), 0);
        assert_eq!(mgr.run_count(), 2);
    }

    #[test]
    fn test_release_memory_is_callable() {
        release_memory();
    }
}
