// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for memory introspection.

/// Errors that can occur when reading memory accounting files.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Failed to read a sysfs, cgroupfs or procfs file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse a numeric value from an accounting file.
    #[error("failed to parse value from {path}: {detail}")]
    ParseError { path: String, detail: String },

    /// The expected accounting file does not exist on this platform.
    #[error("memory accounting not available: {path} not found")]
    NotAvailable { path: String },
}
