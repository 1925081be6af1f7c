//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use chrono::{DateTime, SecondsFormat, Utc};

/// Fold a country name into its case-insensitive lookup key
///
/// Unicode-aware lowercasing, so "ÅLAND ISLANDS" and "Åland Islands"
/// share a key.
pub fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Format a timestamp as ISO-8601 UTC with microseconds and a trailing `Z`
///
/// The fixed width keeps stored timestamps lexicographically ordered.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Format a GDP figure with thousands separators and two decimals
pub fn format_gdp(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Format an optional GDP figure, `N/A` when absent
pub fn format_optional_gdp(value: Option<f64>) -> String {
    value.map(format_gdp).unwrap_or_else(|| String::from("N/A"))
}
