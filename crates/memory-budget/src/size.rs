// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Human-readable byte sizes.
//!
//! Units are binary: `k` is 1024 bytes, `m` is 1024², and so on. The unit
//! letter may be followed by `B` or `iB`, so `"3m"`, `"3MB"` and `"3 MiB"`
//! all mean the same thing.

use crate::BudgetError;

pub(crate) const KIB: u64 = 1 << 10;
pub(crate) const MIB: u64 = 1 << 20;
pub(crate) const GIB: u64 = 1 << 30;
const TIB: u64 = 1 << 40;

const SUFFIXES: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Parses a human-readable number of bytes.
///
/// Fractional values are truncated after scaling, so `"3.02 MiB"` is
/// `3166699` bytes. Case-insensitive; whitespace between the number and the
/// unit is allowed.
///
/// # Examples
/// ```
/// use memory_budget::parse_size;
///
/// assert_eq!(parse_size("1k").unwrap(), 1024);
/// assert_eq!(parse_size("3.02 MiB").unwrap(), 3166699);
/// assert_eq!(parse_size("100 MB").unwrap(), 100 * 1024 * 1024);
/// ```
pub fn parse_size(text: &str) -> Result<u64, BudgetError> {
    let s = text.trim();
    let invalid = || BudgetError::InvalidFormat(text.to_string());

    let num_end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (num_str, rest) = s.split_at(num_end);

    let (int_part, frac_part) = match num_str.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (num_str, None),
    };
    if int_part.is_empty() || frac_part.is_some_and(|f| f.is_empty() || f.contains('.')) {
        return Err(invalid());
    }

    let unit = match rest.trim_start().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => KIB,
        "m" | "mb" | "mib" => MIB,
        "g" | "gb" | "gib" => GIB,
        "t" | "tb" | "tib" => TIB,
        _ => return Err(invalid()),
    };

    match frac_part {
        None => {
            let value: u64 = int_part
                .parse()
                .map_err(|_| BudgetError::Overflow(text.to_string()))?;
            value
                .checked_mul(unit)
                .ok_or_else(|| BudgetError::Overflow(text.to_string()))
        }
        Some(_) => {
            let value: f64 = num_str.parse().map_err(|_| invalid())?;
            let bytes = value * unit as f64;
            if !bytes.is_finite() || bytes >= u64::MAX as f64 {
                return Err(BudgetError::Overflow(text.to_string()));
            }
            Ok(bytes as u64)
        }
    }
}

/// Formats a byte count with two decimals and a binary unit.
///
/// # Examples
/// ```
/// use memory_budget::format_size;
///
/// assert_eq!(format_size(512), "512.00 B");
/// assert_eq!(format_size(1536), "1.50 KiB");
/// ```
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut pos = 0;
    while size >= 1024.0 && pos < SUFFIXES.len() - 1 {
        size /= 1024.0;
        pos += 1;
    }
    format!("{size:.2} {}", SUFFIXES[pos])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_bytes() {
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("1048576").unwrap(), 1 << 20);
        assert_eq!(parse_size("12B").unwrap(), 12);
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(parse_size("1k").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("1kib").unwrap(), 1024);
        assert_eq!(parse_size("10m").unwrap(), 10 << 20);
        assert_eq!(parse_size("2 GiB").unwrap(), 2 << 30);
        assert_eq!(parse_size("1t").unwrap(), 1 << 40);
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(parse_size("3.02 MiB").unwrap(), 3166699);
        assert_eq!(parse_size("0.5k").unwrap(), 512);
    }

    #[test]
    fn test_parse_with_whitespace() {
        assert_eq!(parse_size("  100 MB  ").unwrap(), 100 << 20);
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["", "abc", "m", ".5k", "1.k", "1.2.3", "10 xb", "-1", "1 k b"] {
            assert!(
                matches!(parse_size(bad), Err(BudgetError::InvalidFormat(_))),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_overflow() {
        assert!(matches!(
            parse_size("99999999999999999999"),
            Err(BudgetError::Overflow(_))
        ));
        assert!(matches!(parse_size("20000000t"), Err(BudgetError::Overflow(_))));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0.00 B");
        assert_eq!(format_size(1023), "1023.00 B");
        assert_eq!(format_size(1024), "1.00 KiB");
        assert_eq!(format_size(3166699), "3.02 MiB");
        assert_eq!(format_size(5 << 30), "5.00 GiB");
        assert_eq!(format_size(u64::MAX), "16.00 EiB");
    }
}
