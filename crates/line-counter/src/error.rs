// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the counting engine.
//!
//! None of these are recoverable inside the engine: each one aborts the
//! count and propagates to the caller.

use std::path::PathBuf;

/// Errors that can occur while counting, spilling or merging.
#[derive(Debug, thiserror::Error)]
pub enum CountError {
    /// A run file line does not match `<key>\t<count>` or breaks run order.
    #[error("malformed run {}:{line}: {detail}", path.display())]
    MalformedRun {
        path: PathBuf,
        line: u64,
        detail: String,
    },

    /// A run file could not be created, written or read back.
    #[error("spill failed for {}: {source}", path.display())]
    SpillFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The estimated footprint exceeded the budget and spilling is disabled.
    #[error("memory budget exceeded: estimated {estimated_bytes} bytes, budget {budget_bytes} bytes")]
    OutOfBudget {
        estimated_bytes: u64,
        budget_bytes: u64,
    },

    /// Memory introspection is not accessible.
    #[error("memory oracle unavailable: {0}")]
    OracleUnavailable(#[from] memory_oracle::OracleError),

    /// A key cannot be stored as a single record.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Summing the counts of one key overflowed `u64`.
    #[error("count overflow for key '{key}'")]
    CountOverflow { key: String },

    /// The count was cancelled through its [`CancelFlag`](crate::CancelFlag).
    #[error("count cancelled")]
    Cancelled,

    /// Reading the input stream failed.
    #[error("input error: {0}")]
    Input(#[source] std::io::Error),

    /// A memory budget string could not be parsed.
    #[error("budget error: {0}")]
    Budget(#[from] memory_budget::BudgetError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
