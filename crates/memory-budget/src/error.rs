// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for budget parsing.

/// Errors that can occur when parsing sizes and budgets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BudgetError {
    /// The string is not a number followed by an optional unit suffix.
    #[error("invalid size '{0}': expected a number followed by an optional suffix (k, m, g, t)")]
    InvalidFormat(String),

    /// The size does not fit in 64 bits.
    #[error("size overflow: '{0}'")]
    Overflow(String),

    /// A budget of zero bytes can never be satisfied.
    #[error("memory budget must be greater than zero")]
    ZeroBudget,
}
