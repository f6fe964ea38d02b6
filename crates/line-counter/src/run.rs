// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run files: sorted, immutable partial aggregates on disk.
//!
//! # Format
//! One record per line, keys strictly ascending:
//! ```text
//! <key bytes>\t<decimal count>\n
//! ```
//! The count is everything after the **last** tab, so keys may contain
//! tabs. Keys never contain `\n`.
//!
//! # Lifecycle
//! A [`RunWriter`] writes to `run-<pid>-<seq>.tmp`, then flushes, syncs and
//! renames it to `run-<pid>-<seq>.run` in [`RunWriter::finish`]. Only that
//! call produces a [`RunHandle`]; a writer dropped early removes its
//! temporary file. A handle removes its file when dropped unless it was
//! created with `keep`.

use crate::{CountError, Entry, EntryResult};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const SEPARATOR: u8 = b'\t';
const TERMINATOR: u8 = b'\n';

/// File name of run `id` written by this process, without extension.
fn run_stem(id: u64) -> String {
    format!("run-{}-{id:06}", std::process::id())
}

// ── Writing ────────────────────────────────────────────────────

/// Streams sorted pairs into a new run file.
#[derive(Debug)]
pub struct RunWriter {
    id: u64,
    tmp_path: PathBuf,
    final_path: PathBuf,
    out: Option<BufWriter<File>>,
    entries: u64,
    bytes: u64,
}

impl RunWriter {
    /// Creates the temporary file for run `id` inside `dir`.
    pub fn create(dir: &Path, id: u64) -> Result<Self, CountError> {
        let stem = run_stem(id);
        let tmp_path = dir.join(format!("{stem}.tmp"));
        let final_path = dir.join(format!("{stem}.run"));
        let file = File::create(&tmp_path).map_err(|source| CountError::SpillFailure {
            path: tmp_path.clone(),
            source,
        })?;

        Ok(Self {
            id,
            tmp_path,
            final_path,
            out: Some(BufWriter::new(file)),
            entries: 0,
            bytes: 0,
        })
    }

    /// Appends one record. Callers supply keys in strictly ascending order.
    pub fn write(&mut self, key: &[u8], count: u64) -> Result<(), CountError> {
        if key.contains(&TERMINATOR) {
            return Err(CountError::InvalidKey(format!(
                "key contains a newline: {:?}",
                String::from_utf8_lossy(key)
            )));
        }
        let Some(out) = self.out.as_mut() else {
            return Err(CountError::SpillFailure {
                path: self.tmp_path.clone(),
                source: std::io::Error::other("run writer already closed"),
            });
        };

        let count_text = count.to_string();
        write_record(out, key, &count_text).map_err(|source| CountError::SpillFailure {
            path: self.tmp_path.clone(),
            source,
        })?;

        self.entries += 1;
        self.bytes += (key.len() + count_text.len() + 2) as u64;
        Ok(())
    }

    /// Records written so far.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Flushes, syncs and renames the file into place.
    pub fn finish(mut self, keep: bool) -> Result<RunHandle, CountError> {
        let failure = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| CountError::SpillFailure { path, source }
        };

        if let Some(out) = self.out.take() {
            let file = out
                .into_inner()
                .map_err(|e| e.into_error())
                .map_err(failure(&self.tmp_path))?;
            file.sync_all().map_err(failure(&self.tmp_path))?;
        }
        std::fs::rename(&self.tmp_path, &self.final_path).map_err(failure(&self.final_path))?;

        let handle = RunHandle {
            id: self.id,
            path: std::mem::take(&mut self.final_path),
            entries: self.entries,
            file_bytes: self.bytes,
            keep,
        };
        self.tmp_path = PathBuf::new();
        Ok(handle)
    }
}

fn write_record<W: Write>(out: &mut W, key: &[u8], count: &str) -> std::io::Result<()> {
    out.write_all(key)?;
    out.write_all(&[SEPARATOR])?;
    out.write_all(count.as_bytes())?;
    out.write_all(&[TERMINATOR])
}

impl Drop for RunWriter {
    fn drop(&mut self) {
        if self.tmp_path.as_os_str().is_empty() {
            return;
        }
        drop(self.out.take());
        let _ = std::fs::remove_file(&self.tmp_path);
    }
}

// ── Registered runs ────────────────────────────────────────────

/// A completely written run file.
#[derive(Debug)]
pub struct RunHandle {
    id: u64,
    path: PathBuf,
    entries: u64,
    file_bytes: u64,
    keep: bool,
}

impl RunHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of (key, count) records in the file.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn file_bytes(&self) -> u64 {
        self.file_bytes
    }

    /// Opens the run for sequential reading.
    pub fn open(&self) -> Result<RunReader<BufReader<File>>, CountError> {
        RunReader::open(&self.path)
    }

    /// Marks the file for removal on drop, even if it was written to be kept.
    pub(crate) fn discard(mut self) {
        self.keep = false;
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if !self.keep {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("failed to remove run {}: {e}", self.path.display());
                }
            }
        }
    }
}

// ── Reading ────────────────────────────────────────────────────

/// Iterates the records of one run, validating format and order.
///
/// The first malformed record is yielded as [`CountError::MalformedRun`];
/// the reader ends after any error.
#[derive(Debug)]
pub struct RunReader<R> {
    path: PathBuf,
    reader: R,
    line: u64,
    buf: Vec<u8>,
    prev: Option<Vec<u8>>,
    done: bool,
}

impl RunReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, CountError> {
        let file = File::open(path).map_err(|source| CountError::SpillFailure {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(path, BufReader::new(file)))
    }
}

impl<R: BufRead> RunReader<R> {
    /// Reads records from `reader`; `path` is only used in errors.
    pub fn from_reader(path: impl Into<PathBuf>, reader: R) -> Self {
        Self {
            path: path.into(),
            reader,
            line: 0,
            buf: Vec::new(),
            prev: None,
            done: false,
        }
    }

    fn malformed(&self, detail: impl Into<String>) -> CountError {
        CountError::MalformedRun {
            path: self.path.clone(),
            line: self.line,
            detail: detail.into(),
        }
    }

    fn read_record(&mut self) -> Result<Option<Entry>, CountError> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(TERMINATOR, &mut self.buf)
            .map_err(|source| CountError::SpillFailure {
                path: self.path.clone(),
                source,
            })?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;

        let Some(record) = self.buf.strip_suffix(&[TERMINATOR]) else {
            return Err(self.malformed("unterminated record"));
        };
        let Some(tab) = record.iter().rposition(|&b| b == SEPARATOR) else {
            return Err(self.malformed("missing tab separator"));
        };
        let (key, count_field) = (&record[..tab], &record[tab + 1..]);

        let count = parse_count(count_field).ok_or_else(|| {
            self.malformed(format!(
                "invalid count {:?}",
                String::from_utf8_lossy(count_field)
            ))
        })?;
        if count == 0 {
            return Err(self.malformed("zero count"));
        }
        if let Some(prev) = &self.prev {
            if key <= prev.as_slice() {
                return Err(self.malformed("keys not strictly ascending"));
            }
        }

        let key = key.to_vec();
        self.prev = Some(key.clone());
        Ok(Some((key, count)))
    }
}

/// Plain decimal digits only: no sign, no whitespace.
fn parse_count(field: &[u8]) -> Option<u64> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(field).ok()?.parse().ok()
}

impl<R: BufRead> Iterator for RunReader<R> {
    type Item = EntryResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
